//! Name-based liveness checks and signalling over the process table.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::platform::{BoxError, ProcessTable};

/// Reports whether the tunnel process is alive.
///
/// A failed lookup reads as "not running". That can let a duplicate launch
/// through; the tunnel process guards itself with its own lock file.
pub struct ProcessProbe<'a> {
    table: &'a dyn ProcessTable,
}

impl<'a> ProcessProbe<'a> {
    pub fn new(table: &'a dyn ProcessTable) -> Self {
        Self { table }
    }

    pub fn is_running(&self, name: &str) -> bool {
        match self.table.is_running(name) {
            Ok(running) => {
                debug!("Process '{}' running: {}", name, running);
                running
            }
            Err(e) => {
                warn!("Process lookup for '{}' failed, assuming not running: {}", name, e);
                false
            }
        }
    }
}

/// Process table backed by procfs, matching on `/proc/<pid>/comm`.
pub struct ProcfsTable {
    root: PathBuf,
}

impl Default for ProcfsTable {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/proc"),
        }
    }
}

impl ProcfsTable {
    /// Table reading from an alternative procfs mount.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pids whose command name is exactly `name`.
    ///
    /// The kernel cuts `comm` to 15 bytes, so longer names are matched on
    /// the truncated `comm` and then confirmed against the basename of argv[0].
    pub fn pids_named(&self, name: &str) -> io::Result<Vec<i32>> {
        let wanted = &name.as_bytes()[..name.len().min(COMM_LEN)];
        let truncated = wanted.len() < name.len();
        let mut pids = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<i32>().ok())
            else {
                continue;
            };

            // Processes can exit between read_dir and the reads below.
            let comm = match fs::read(entry.path().join("comm")) {
                Ok(comm) => comm,
                Err(_) => continue,
            };
            if comm.strip_suffix(b"\n").unwrap_or(&comm) != wanted {
                continue;
            }
            if truncated && !argv0_is(&entry.path(), name) {
                continue;
            }
            pids.push(pid);
        }

        Ok(pids)
    }
}

/// Longest command name the kernel keeps in `comm`.
const COMM_LEN: usize = 15;

fn argv0_is(proc_dir: &Path, name: &str) -> bool {
    let Ok(cmdline) = fs::read(proc_dir.join("cmdline")) else {
        return false;
    };
    let argv0 = cmdline.split(|b| *b == 0).next().unwrap_or_default();
    let base = argv0.rsplit(|b| *b == b'/').next().unwrap_or_default();
    base == name.as_bytes()
}

impl ProcessTable for ProcfsTable {
    fn is_running(&self, name: &str) -> Result<bool, BoxError> {
        Ok(!self.pids_named(name)?.is_empty())
    }

    fn signal_all(&self, name: &str, signal: Signal) -> Result<usize, BoxError> {
        let mut signalled = 0;

        for pid in self.pids_named(name)? {
            match kill(Pid::from_raw(pid), signal) {
                Ok(()) => {
                    debug!("Sent {:?} to {} ({})", signal, name, pid);
                    signalled += 1;
                }
                Err(Errno::ESRCH) => debug!("Process {} ({}) already gone", pid, name),
                Err(e) => return Err(format!("kill {} failed: {}", pid, e).into()),
            }
        }

        Ok(signalled)
    }
}
