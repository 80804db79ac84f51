pub mod config;
pub mod error;
pub mod launcher;
pub mod lifecycle;
pub mod materialize;
pub mod params;
pub mod probe;
pub mod scaffold;
pub mod teardown;

#[cfg(test)]
mod testing;

pub use error::{ConfigError, LaunchError, StartError, WireError};
pub use lifecycle::{LifecycleManager, LifecycleState, StartOutcome};

/// Interfaces that platform shells implement to hand OS access to the core
/// without the core reaching for ambient global state.
pub mod platform {
    use std::path::{Path, PathBuf};

    pub use nix::sys::signal::Signal;

    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

    /// Key-value lookup over the device settings table.
    pub trait ParameterSource {
        fn get(&self, key: &str) -> Option<String>;

        /// Integer view of a setting; absent or non-numeric values read as 0.
        fn get_int(&self, key: &str) -> i64 {
            self.get(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0)
        }
    }

    /// Name-based view of the live process set.
    pub trait ProcessTable {
        fn is_running(&self, name: &str) -> Result<bool, BoxError>;
        /// Signals every process named `name`; returns how many were hit.
        fn signal_all(&self, name: &str, signal: Signal) -> Result<usize, BoxError>;
    }

    /// Trait for starting detached processes; returns the child pid.
    pub trait ProcessSpawner {
        fn spawn(&self, program: &Path, args: &[String]) -> Result<u32, BoxError>;
    }

    /// Trait for platform-correct config paths.
    pub trait AppPaths {
        /// Filesystem layout (working dir, templates, binary).
        fn config_path(&self) -> PathBuf;
        /// Connection settings table.
        fn params_path(&self) -> PathBuf;
    }
}
