//! Test doubles for the OS collaborators.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Layout;
use crate::platform::{BoxError, ProcessSpawner, ProcessTable, Signal};

/// Layout under a temp root with templates and binary in place.
pub fn seeded_layout(root: &Path) -> Layout {
    let layout = Layout::rooted_at(root);
    fs::create_dir_all(&layout.template_dir).unwrap();
    for (target, _) in layout.helper_links() {
        fs::write(target, "#!/bin/sh\n").unwrap();
    }
    fs::create_dir_all(layout.tunnel_binary.parent().unwrap()).unwrap();
    fs::write(&layout.tunnel_binary, "").unwrap();
    fs::create_dir_all(layout.working_dir.parent().unwrap()).unwrap();
    layout
}

#[derive(Default)]
pub struct FakeProcesses {
    alive: Mutex<HashSet<String>>,
    signals: Mutex<Vec<(String, Signal)>>,
    lookups: Mutex<usize>,
    broken: bool,
}

impl FakeProcesses {
    pub fn running(names: &[&str]) -> Self {
        let fake = Self::default();
        for name in names {
            fake.start(name);
        }
        fake
    }

    /// Every lookup and signal fails.
    pub fn unsignalable() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn start(&self, name: &str) {
        self.alive.lock().unwrap().insert(name.to_string());
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.alive.lock().unwrap().contains(name)
    }

    pub fn signals(&self) -> Vec<(String, Signal)> {
        self.signals.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

impl ProcessTable for FakeProcesses {
    fn is_running(&self, name: &str) -> Result<bool, BoxError> {
        *self.lookups.lock().unwrap() += 1;
        if self.broken {
            return Err("process table unavailable".into());
        }
        Ok(self.is_alive(name))
    }

    fn signal_all(&self, name: &str, signal: Signal) -> Result<usize, BoxError> {
        self.signals
            .lock()
            .unwrap()
            .push((name.to_string(), signal));
        if self.broken {
            return Err("operation not permitted".into());
        }
        Ok(usize::from(self.alive.lock().unwrap().remove(name)))
    }
}

#[derive(Default)]
pub struct RecordingSpawner {
    calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    fail: bool,
}

impl RecordingSpawner {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn(&self, program: &Path, args: &[String]) -> Result<u32, BoxError> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_path_buf(), args.to_vec()));
        if self.fail {
            return Err("exec format error".into());
        }
        Ok(4242)
    }
}
