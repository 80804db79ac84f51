//! Filesystem scaffolding the tunnel process needs before it can run: the
//! working directory, helper script links and the aliased tunnel binary.

use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::{DirBuilderExt, symlink};
use std::path::Path;

use log::{debug, info};

use crate::config::Layout;
use crate::error::WireError;

pub struct LinkWirer<'a> {
    layout: &'a Layout,
}

impl<'a> LinkWirer<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Rebuild the working directory from scratch and populate its links.
    ///
    /// Stops at the first failing step. The caller owns rollback.
    pub fn wire(&self) -> Result<(), WireError> {
        let layout = self.layout;
        let working_dir = &layout.working_dir;

        remove_stale(working_dir)?;

        DirBuilder::new()
            .mode(0o700)
            .create(working_dir)
            .map_err(|source| WireError::CreateDir {
                path: working_dir.clone(),
                source,
            })?;
        debug!("Created working directory {:?}", working_dir);

        for (target, link) in layout.helper_links() {
            link_to(&target, &link)?;
        }
        link_to(&layout.tunnel_binary, &layout.binary_alias())?;

        info!("Scaffolding ready in {:?}", working_dir);
        Ok(())
    }
}

/// Remove whatever sits at `path`, directory or not. Returns whether
/// anything was there.
pub(crate) fn remove_path(path: &Path) -> io::Result<bool> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn remove_stale(path: &Path) -> Result<(), WireError> {
    match remove_path(path) {
        Ok(removed) => {
            if removed {
                debug!("Removed stale {:?}", path);
            }
            Ok(())
        }
        Err(source) => Err(WireError::RemoveStale {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn link_to(target: &Path, link: &Path) -> Result<(), WireError> {
    if fs::metadata(target).is_err() {
        return Err(WireError::MissingTarget {
            target: target.to_path_buf(),
        });
    }

    symlink(target, link).map_err(|source| WireError::Link {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source,
    })?;
    debug!("Linked {:?} -> {:?}", link, target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_layout;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn wires_all_links() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());

        LinkWirer::new(&layout).wire().unwrap();

        let mode = fs::metadata(&layout.working_dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        for (target, link) in layout.helper_links() {
            assert_eq!(fs::read_link(&link).unwrap(), target);
        }
        assert_eq!(
            fs::read_link(layout.binary_alias()).unwrap(),
            layout.tunnel_binary
        );
    }

    #[test]
    fn rewiring_replaces_previous_state() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        let wirer = LinkWirer::new(&layout);

        wirer.wire().unwrap();
        fs::write(layout.working_dir.join("leftover"), "x").unwrap();
        wirer.wire().unwrap();

        assert!(!layout.working_dir.join("leftover").exists());
        assert!(layout.binary_alias().exists());
    }

    #[test]
    fn stale_file_at_working_dir_is_replaced() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        fs::write(&layout.working_dir, "not a directory").unwrap();

        LinkWirer::new(&layout).wire().unwrap();

        assert!(layout.working_dir.is_dir());
    }

    #[test]
    fn missing_binary_fails_after_helper_links() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        fs::remove_file(&layout.tunnel_binary).unwrap();

        let err = LinkWirer::new(&layout).wire().unwrap_err();

        assert!(
            matches!(err, WireError::MissingTarget { ref target } if *target == layout.tunnel_binary)
        );
        // Partial state is left for the caller's teardown.
        assert!(layout.ip_up_path().exists());
    }

    #[test]
    fn missing_template_fails() {
        let root = tempfile::tempdir().unwrap();
        let layout = seeded_layout(root.path());
        fs::remove_dir_all(&layout.template_dir).unwrap();

        assert!(matches!(
            LinkWirer::new(&layout).wire(),
            Err(WireError::MissingTarget { .. })
        ));
    }
}
