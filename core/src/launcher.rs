//! Starts the tunnel process through its alias and lets it run on its own.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, info, warn};

use crate::error::LaunchError;
use crate::platform::{BoxError, ProcessSpawner};

pub struct Launcher<'a> {
    spawner: &'a dyn ProcessSpawner,
}

impl<'a> Launcher<'a> {
    pub fn new(spawner: &'a dyn ProcessSpawner) -> Self {
        Self { spawner }
    }

    /// Spawn `binary_alias file <config_path>`. Success means the process was
    /// created, not that the tunnel is up.
    pub fn launch(&self, binary_alias: &Path, config_path: &Path) -> Result<u32, LaunchError> {
        let args = vec!["file".to_string(), config_path.display().to_string()];
        info!("Spawning tunnel: {} {:?}", binary_alias.display(), args);

        let pid = self
            .spawner
            .spawn(binary_alias, &args)
            .map_err(|e| LaunchError::Spawn {
                program: binary_alias.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!("Tunnel process started (pid {})", pid);
        Ok(pid)
    }
}

/// Spawns with silenced stdio and reaps the child from a background thread.
#[derive(Default)]
pub struct DetachedSpawner;

impl ProcessSpawner for DetachedSpawner {
    fn spawn(&self, program: &Path, args: &[String]) -> Result<u32, BoxError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child.id();

        thread::spawn(move || match child.wait() {
            Ok(status) => debug!("Process {} exited: {}", pid, status),
            Err(e) => warn!("Failed to reap process {}: {}", pid, e),
        });

        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSpawner;
    use std::path::PathBuf;

    #[test]
    fn passes_file_argument() {
        let spawner = RecordingSpawner::default();

        let pid = Launcher::new(&spawner)
            .launch(Path::new("/etc/vpn/pptpclient"), Path::new("/etc/vpn/options.vpn"))
            .unwrap();

        assert_eq!(pid, 4242);
        assert_eq!(
            spawner.calls(),
            vec![(
                PathBuf::from("/etc/vpn/pptpclient"),
                vec!["file".to_string(), "/etc/vpn/options.vpn".to_string()]
            )]
        );
    }

    #[test]
    fn spawn_failure_is_reported() {
        let spawner = RecordingSpawner::failing();

        let err = Launcher::new(&spawner)
            .launch(Path::new("/missing"), Path::new("/etc/vpn/options.vpn"))
            .unwrap_err();

        assert!(matches!(err, LaunchError::Spawn { ref program, .. } if program == Path::new("/missing")));
    }

    #[test]
    fn detached_spawner_reports_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let result = DetachedSpawner.spawn(&dir.path().join("nope"), &[]);

        assert!(result.is_err());
    }

    #[test]
    fn detached_spawner_starts_real_process() {
        let pid = DetachedSpawner
            .spawn(Path::new("/bin/sh"), &["-c".to_string(), "exit 0".to_string()])
            .unwrap();

        assert!(pid > 0);
    }
}
