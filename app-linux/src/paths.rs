use std::path::PathBuf;

use pptp_client_core::platform::AppPaths;

/// Config locations; explicit CLI paths win over the XDG defaults.
#[derive(Default)]
pub struct LinuxPaths {
    pub config: Option<PathBuf>,
    pub params: Option<PathBuf>,
}

impl LinuxPaths {
    fn base() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pptp-client")
    }
}

impl AppPaths for LinuxPaths {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| Self::base().join("layout.toml"))
    }

    fn params_path(&self) -> PathBuf {
        self.params
            .clone()
            .unwrap_or_else(|| Self::base().join("params.toml"))
    }
}
