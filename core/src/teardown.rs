use std::fs;

use log::{debug, error, info};

use crate::config::Layout;
use crate::platform::{ProcessTable, Signal};
use crate::scaffold::remove_path;

/// Stops the tunnel process and erases the scaffolding. Never fails; a
/// missing process or missing files are the normal idle state.
pub struct Teardown<'a> {
    layout: &'a Layout,
    processes: &'a dyn ProcessTable,
}

impl<'a> Teardown<'a> {
    pub fn new(layout: &'a Layout, processes: &'a dyn ProcessTable) -> Self {
        Self { layout, processes }
    }

    pub fn run(&self) {
        let layout = self.layout;

        match self
            .processes
            .signal_all(&layout.process_name, Signal::SIGTERM)
        {
            Ok(0) => debug!("No '{}' process to stop", layout.process_name),
            Ok(n) => info!("Sent SIGTERM to {} '{}' process(es)", n, layout.process_name),
            Err(e) => error!("Failed to signal '{}': {}", layout.process_name, e),
        }

        match remove_path(&layout.working_dir) {
            Ok(true) => info!("Removed {:?}", layout.working_dir),
            Ok(false) => debug!("{:?} already absent", layout.working_dir),
            Err(e) => {
                error!("Failed to remove {:?}: {}", layout.working_dir, e);
                // Still try to drop the individual artifacts.
                for path in [layout.binary_alias(), layout.options_path()]
                    .into_iter()
                    .chain(layout.helper_links().into_iter().map(|(_, link)| link))
                {
                    if let Err(e) = fs::remove_file(&path) {
                        debug!("Could not remove {:?}: {}", path, e);
                    }
                }
                if let Err(e) = fs::remove_dir(&layout.working_dir) {
                    debug!("Could not remove {:?}: {}", layout.working_dir, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaffold::LinkWirer;
    use crate::testing::{FakeProcesses, seeded_layout};

    #[test]
    fn removes_scaffolding_and_signals() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        LinkWirer::new(&layout).wire().unwrap();
        fs::write(layout.options_path(), "lock\n").unwrap();
        let processes = FakeProcesses::running(&["pptpclient"]);

        Teardown::new(&layout, &processes).run();

        assert!(!layout.working_dir.exists());
        assert!(!processes.is_alive("pptpclient"));
        assert_eq!(processes.signals(), vec![("pptpclient".to_string(), Signal::SIGTERM)]);
        // Link targets are untouched.
        assert!(layout.tunnel_binary.exists());
        assert!(layout.template_dir.join("ip-up").exists());
    }

    #[test]
    fn idempotent_on_clean_system() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        let processes = FakeProcesses::default();
        let teardown = Teardown::new(&layout, &processes);

        teardown.run();
        teardown.run();

        assert!(!layout.working_dir.exists());
        assert_eq!(processes.signals().len(), 2);
    }

    #[test]
    fn stale_file_at_working_dir_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        fs::write(&layout.working_dir, "stale").unwrap();
        let processes = FakeProcesses::default();

        Teardown::new(&layout, &processes).run();

        assert!(fs::symlink_metadata(&layout.working_dir).is_err());
    }

    #[test]
    fn dangling_link_at_working_dir_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        std::os::unix::fs::symlink(root.path().join("gone"), &layout.working_dir).unwrap();
        let processes = FakeProcesses::default();

        Teardown::new(&layout, &processes).run();

        assert!(fs::symlink_metadata(&layout.working_dir).is_err());
    }

    #[test]
    fn signal_failure_does_not_stop_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        LinkWirer::new(&layout).wire().unwrap();
        let processes = FakeProcesses::unsignalable();

        Teardown::new(&layout, &processes).run();

        assert!(!layout.working_dir.exists());
    }
}
