//! Filesystem layout loading and management.
//! Uses injected `AppPaths` so platform shells control where files live.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::platform::AppPaths;

/// Where the tunnel scaffolding lives and what the tunnel process is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Owner-only directory holding every artifact `start` creates.
    pub working_dir: PathBuf,
    /// Read-only location of the helper script templates.
    pub template_dir: PathBuf,
    /// Script names linked from `template_dir`, run on link up and down.
    pub ip_up_script: String,
    pub ip_down_script: String,
    /// Real binary the alias under `working_dir` points at.
    pub tunnel_binary: PathBuf,
    /// Name of the alias, and therefore of the running tunnel process.
    pub process_name: String,
    pub options_file: String,
    pub plugin: String,
    pub ipparam: String,
}

impl Layout {
    /// Load the layout from the provided paths. Creates a default file if missing.
    pub fn load_with(paths: &dyn AppPaths) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = paths.config_path();

        if !config_path.exists() {
            info!(
                "Layout file not found at {:?}, creating default layout",
                config_path
            );
            let default_layout = Self::default();
            default_layout.save_with(paths)?;
            return Ok(default_layout);
        }

        debug!("Loading layout from {:?}", config_path);
        let content = fs::read_to_string(&config_path)?;
        let layout: Layout = toml::from_str(&content)?;

        info!(
            "Loaded layout: working_dir={:?}, process_name={}",
            layout.working_dir, layout.process_name
        );
        Ok(layout)
    }

    /// Save the layout to the provided paths.
    pub fn save_with(&self, paths: &dyn AppPaths) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = paths.config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        info!("Saved layout to {:?}", config_path);
        Ok(())
    }

    /// Layout rooted under `base` instead of the system locations.
    pub fn rooted_at(base: &std::path::Path) -> Self {
        Self {
            working_dir: base.join("etc/vpn"),
            template_dir: base.join("rom/etc/vpn"),
            tunnel_binary: base.join("usr/sbin/pppd"),
            ..Self::default()
        }
    }

    pub fn options_path(&self) -> PathBuf {
        self.working_dir.join(&self.options_file)
    }

    pub fn binary_alias(&self) -> PathBuf {
        self.working_dir.join(&self.process_name)
    }

    pub fn ip_up_path(&self) -> PathBuf {
        self.working_dir.join(&self.ip_up_script)
    }

    pub fn ip_down_path(&self) -> PathBuf {
        self.working_dir.join(&self.ip_down_script)
    }

    /// (target, link) pairs for the helper scripts.
    pub fn helper_links(&self) -> Vec<(PathBuf, PathBuf)> {
        vec![
            (self.template_dir.join(&self.ip_up_script), self.ip_up_path()),
            (
                self.template_dir.join(&self.ip_down_script),
                self.ip_down_path(),
            ),
        ]
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("/etc/vpn"),
            template_dir: PathBuf::from("/rom/etc/vpn"),
            ip_up_script: "ip-up".to_string(),
            ip_down_script: "ip-down".to_string(),
            tunnel_binary: PathBuf::from("/usr/sbin/pppd"),
            process_name: "pptpclient".to_string(),
            options_file: "options.vpn".to_string(),
            plugin: "pptp.so".to_string(),
            ipparam: "kelokepptpd".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct TestPaths(PathBuf);

    impl AppPaths for TestPaths {
        fn config_path(&self) -> PathBuf {
            self.0.join("conf").join("layout.toml")
        }

        fn params_path(&self) -> PathBuf {
            self.0.join("conf").join("params.toml")
        }
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TestPaths(dir.path().to_path_buf());

        let layout = Layout::load_with(&paths).unwrap();

        assert_eq!(layout, Layout::default());
        assert!(paths.config_path().exists());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = TestPaths(dir.path().to_path_buf());
        fs::create_dir_all(paths.config_path().parent().unwrap()).unwrap();
        fs::write(
            paths.config_path(),
            "working_dir = \"/tmp/vpn\"\nprocess_name = \"vpnc\"\n",
        )
        .unwrap();

        let layout = Layout::load_with(&paths).unwrap();

        assert_eq!(layout.working_dir, Path::new("/tmp/vpn"));
        assert_eq!(layout.binary_alias(), Path::new("/tmp/vpn/vpnc"));
        assert_eq!(layout.tunnel_binary, Path::new("/usr/sbin/pppd"));
        assert_eq!(layout.ip_up_path(), Path::new("/tmp/vpn/ip-up"));
        assert_eq!(layout.ip_down_script, "ip-down");
    }

    #[test]
    fn helper_links_point_into_template_dir() {
        let layout = Layout::default();
        let links = layout.helper_links();

        assert_eq!(
            links,
            vec![
                (
                    PathBuf::from("/rom/etc/vpn/ip-up"),
                    PathBuf::from("/etc/vpn/ip-up")
                ),
                (
                    PathBuf::from("/rom/etc/vpn/ip-down"),
                    PathBuf::from("/etc/vpn/ip-down")
                ),
            ]
        );
        assert_eq!(layout.options_path(), Path::new("/etc/vpn/options.vpn"));
    }
}
