//! Tunnel lifecycle management.
//! Orchestrates probe, scaffolding, materialization and launch behind
//! `start`/`stop`, with a single rollback path on failure.

use std::sync::Arc;

use log::{debug, error, info};

use crate::config::Layout;
use crate::error::StartError;
use crate::launcher::Launcher;
use crate::materialize::{self, ConfigMaterializer};
use crate::params::ConnectionParameters;
use crate::platform::{ParameterSource, ProcessSpawner, ProcessTable};
use crate::probe::ProcessProbe;
use crate::scaffold::LinkWirer;
use crate::teardown::Teardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    StoppingCleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The tunnel process was already alive; nothing was touched.
    AlreadyRunning,
    Launched { pid: u32 },
}

/// Owns the start/stop sequence for the single tunnel instance described
/// by `layout`. Only one such instance exists per working directory.
pub struct LifecycleManager {
    layout: Layout,
    params: Arc<dyn ParameterSource>,
    processes: Arc<dyn ProcessTable>,
    spawner: Arc<dyn ProcessSpawner>,
    state: LifecycleState,
}

impl LifecycleManager {
    pub fn new(
        layout: Layout,
        params: Arc<dyn ParameterSource>,
        processes: Arc<dyn ProcessTable>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            layout,
            params,
            processes,
            spawner,
            state: LifecycleState::Idle,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether the tunnel process is alive right now.
    pub fn is_running(&self) -> bool {
        ProcessProbe::new(self.processes.as_ref()).is_running(&self.layout.process_name)
    }

    /// Bring the tunnel up. On any failure the scaffolding is torn down
    /// before the error is returned.
    ///
    /// The probe and the launch are not atomic: two racing starts can both
    /// launch. The tunnel process rejects the duplicate through its lock file.
    pub fn start(&mut self) -> Result<StartOutcome, StartError> {
        if self.is_running() {
            info!(
                "Tunnel '{}' already running, nothing to do",
                self.layout.process_name
            );
            self.state = LifecycleState::Running;
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.state = LifecycleState::Starting;
        info!("Starting tunnel '{}'", self.layout.process_name);

        match self.bring_up() {
            Ok(pid) => {
                self.state = LifecycleState::Running;
                Ok(StartOutcome::Launched { pid })
            }
            Err(e) => {
                error!("Start failed, rolling back: {}", e);
                self.rollback();
                Err(e)
            }
        }
    }

    /// Tear everything down. Safe to call in any state.
    pub fn stop(&mut self) {
        info!("Stopping tunnel '{}'", self.layout.process_name);
        self.rollback();
    }

    /// The options text `start` would write, with the password masked.
    pub fn preview(&self) -> Result<String, StartError> {
        let params = ConnectionParameters::read(self.params.as_ref());
        let text = ConfigMaterializer::new(&self.layout).render(&params)?;
        Ok(materialize::redact(&text))
    }

    fn bring_up(&self) -> Result<u32, StartError> {
        LinkWirer::new(&self.layout).wire()?;

        let params = ConnectionParameters::read(self.params.as_ref());
        let options_path = self.layout.options_path();
        ConfigMaterializer::new(&self.layout).materialize(&params, &options_path)?;

        let pid = Launcher::new(self.spawner.as_ref())
            .launch(&self.layout.binary_alias(), &options_path)?;
        Ok(pid)
    }

    fn rollback(&mut self) {
        self.state = LifecycleState::StoppingCleanup;
        Teardown::new(&self.layout, self.processes.as_ref()).run();
        self.state = LifecycleState::Idle;
        debug!("Tunnel '{}' is idle", self.layout.process_name);
    }
}
