use std::sync::Arc;

use log::{error, info, warn};
use pptp_client_core::LifecycleManager;
use pptp_client_core::config::Layout;
use pptp_client_core::launcher::DetachedSpawner;
use pptp_client_core::params::TomlParameterStore;
use pptp_client_core::platform::AppPaths;
use pptp_client_core::probe::ProcfsTable;

use crate::paths::LinuxPaths;

/// Shared application state for the Linux shell.
pub struct AppState {
    pub manager: LifecycleManager,
    pub paths: LinuxPaths,
}

impl AppState {
    pub fn new(paths: LinuxPaths, overrides: &[(String, String)]) -> Result<Self, String> {
        let layout = match Layout::load_with(&paths) {
            Ok(layout) => {
                info!("Loaded layout successfully");
                layout
            }
            Err(e) => {
                error!("Failed to load layout: {}", e);
                warn!("Using default layout");
                Layout::default()
            }
        };

        let params_path = paths.params_path();
        let params = TomlParameterStore::load(&params_path)
            .map_err(|e| format!("failed to load parameters from {:?}: {}", params_path, e))?
            .with_overrides(overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let manager = LifecycleManager::new(
            layout,
            Arc::new(params),
            Arc::new(ProcfsTable::default()),
            Arc::new(DetachedSpawner),
        );

        Ok(Self { manager, paths })
    }
}
