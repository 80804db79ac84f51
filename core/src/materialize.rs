//! Renders connection parameters into the options file read by the tunnel
//! process and writes it into the working directory.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Layout;
use crate::error::ConfigError;
use crate::params::{ConnectionParameters, Encryption, PeerDns};

pub const DEFAULT_MTU: u32 = 1450;
pub const DEFAULT_MRU: u32 = 1450;

pub struct ConfigMaterializer<'a> {
    layout: &'a Layout,
}

impl<'a> ConfigMaterializer<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Render the full options text. Fails when either credential is absent.
    pub fn render(&self, params: &ConnectionParameters) -> Result<String, ConfigError> {
        let missing_username = params.username.is_none();
        let missing_password = params.password.is_none();
        let text = self.render_directives(params);

        if missing_username || missing_password {
            return Err(ConfigError::MissingCredentials {
                username: missing_username,
                password: missing_password,
            });
        }
        Ok(text)
    }

    /// Render, then write to `destination` with owner-only permissions.
    /// Nothing is written when rendering fails.
    pub fn materialize(
        &self,
        params: &ConnectionParameters,
        destination: &Path,
    ) -> Result<(), ConfigError> {
        let text = self.render(params)?;

        write_private(destination, &text).map_err(|source| ConfigError::Write {
            path: destination.to_path_buf(),
            source,
        })?;

        info!("Wrote tunnel options to {:?}", destination);
        Ok(())
    }

    fn render_directives(&self, params: &ConnectionParameters) -> String {
        let layout = self.layout;
        let mut out = String::new();

        out.push_str(
            "lock\n\
             noauth\n\
             refuse-eap\n\
             lcp-echo-failure 3\n\
             lcp-echo-interval 2\n\
             maxfail 0\n\
             persist\n",
        );
        line(&mut out, format_args!("plugin {}", layout.plugin));
        line(&mut out, format_args!("pptp_server {}", params.server));

        if params.default_route {
            out.push_str("defaultroute\n");
        }
        if params.peer_dns != PeerDns::Disabled {
            out.push_str("usepeerdns\n");
        }

        out.push_str("idle 0\n");
        line(
            &mut out,
            format_args!("ip-up-script {}", layout.ip_up_path().display()),
        );
        line(
            &mut out,
            format_args!("ip-down-script {}", layout.ip_down_path().display()),
        );
        line(&mut out, format_args!("ipparam {}", layout.ipparam));

        line(&mut out, format_args!("mtu {}", effective_mtu(params)));
        if let Some(mru) = effective_mru(params) {
            line(&mut out, format_args!("mru {mru}"));
        }

        match &params.username {
            Some(name) => line(&mut out, format_args!("name {name}")),
            None => debug!("No username configured"),
        }
        match &params.password {
            Some(password) => line(&mut out, format_args!("password {password}")),
            None => debug!("No password configured"),
        }

        match params.encryption {
            Encryption::None => out.push_str("nomppe\n"),
            Encryption::No40Require128 => out.push_str("nomppe-40\nrequire-mppe-128\n"),
            Encryption::Require => out.push_str("require-mppe\n"),
            Encryption::Default => {}
        }
        if params.stateless {
            out.push_str("nomppe-stateful\n");
        } else {
            out.push_str("mppe-stateful\n");
        }

        line(&mut out, format_args!("unit {}", params.wan_proto.tunnel_unit()));
        line(&mut out, format_args!("{}", params.custom));
        out
    }
}

fn line(out: &mut String, args: std::fmt::Arguments<'_>) {
    // Writing into a String cannot fail.
    let _ = out.write_fmt(args);
    out.push('\n');
}

/// Override only counts when explicitly enabled.
pub fn effective_mtu(params: &ConnectionParameters) -> u32 {
    match (params.mtu_enable, params.mtu) {
        (true, Some(mtu)) => mtu,
        _ => DEFAULT_MTU,
    }
}

/// Emitted only while the enable flag is off; the polarity is inverted
/// relative to MTU and must stay that way.
pub fn effective_mru(params: &ConnectionParameters) -> Option<u32> {
    if params.mru_enable {
        None
    } else {
        Some(params.mru.unwrap_or(DEFAULT_MRU))
    }
}

/// Mask the password directive so rendered text can be shown to a user.
pub fn redact(text: &str) -> String {
    text.lines()
        .map(|l| {
            if l.starts_with("password ") {
                "password ********"
            } else {
                l
            }
        })
        .fold(String::new(), |mut acc, l| {
            acc.push_str(l);
            acc.push('\n');
            acc
        })
}

fn write_private(destination: &Path, text: &str) -> io::Result<()> {
    let tmp = temp_sibling(destination);
    let result = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&tmp)
        .and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, destination));

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            debug!("Could not remove {:?}: {}", tmp, e);
        }
    }
    result
}

fn temp_sibling(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.tmp"))
}
