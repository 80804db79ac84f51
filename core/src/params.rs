//! Connection settings: the keys read from the settings table, the stores
//! that back it, and the immutable snapshot taken on every start.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::platform::ParameterSource;

pub const SERVER: &str = "pptp_client_srvip";
pub const USERNAME: &str = "pptp_client_username";
pub const PASSWORD: &str = "pptp_client_passwd";
pub const DEFAULT_ROUTE: &str = "pptp_client_dfltroute";
pub const PEER_DNS: &str = "pptp_client_peerdns";
pub const MTU: &str = "pptp_client_mtu";
pub const MTU_ENABLE: &str = "pptp_client_mtuenable";
pub const MRU: &str = "pptp_client_mru";
pub const MRU_ENABLE: &str = "pptp_client_mruenable";
pub const CRYPT: &str = "pptp_client_crypt";
pub const STATELESS: &str = "pptp_client_stateless";
pub const CUSTOM: &str = "pptp_client_custom";
pub const WAN_PROTO: &str = "wan_proto";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerDns {
    Enabled,
    Disabled,
    /// Key absent; behaves like `Enabled`.
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    None,
    No40Require128,
    Require,
    Default,
}

impl Encryption {
    fn from_code(code: i64) -> Self {
        match code {
            1 => Encryption::None,
            2 => Encryption::No40Require128,
            3 => Encryption::Require,
            _ => Encryption::Default,
        }
    }
}

/// Classification of the uplink; the tunnel takes ppp unit 1 when the WAN
/// itself already occupies unit 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WanProto {
    Dhcp,
    Static,
    Pppoe,
    Pptp,
    L2tp,
    Disabled,
    Other(String),
}

impl WanProto {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "dhcp" => WanProto::Dhcp,
            "static" => WanProto::Static,
            "pppoe" => WanProto::Pppoe,
            "pptp" => WanProto::Pptp,
            "l2tp" => WanProto::L2tp,
            "disabled" => WanProto::Disabled,
            other => WanProto::Other(other.to_string()),
        }
    }

    pub fn tunnel_unit(&self) -> u32 {
        match self {
            WanProto::Pppoe | WanProto::Pptp | WanProto::L2tp => 1,
            _ => 0,
        }
    }
}

/// Snapshot of every setting the artifact is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub server: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_route: bool,
    pub peer_dns: PeerDns,
    pub mtu_enable: bool,
    pub mtu: Option<u32>,
    pub mru_enable: bool,
    pub mru: Option<u32>,
    pub encryption: Encryption,
    pub stateless: bool,
    pub custom: String,
    pub wan_proto: WanProto,
}

impl ConnectionParameters {
    pub fn read(source: &dyn ParameterSource) -> Self {
        let server = source.get(SERVER).unwrap_or_else(|| {
            warn!("No PPTP server address configured ({SERVER})");
            String::new()
        });

        let peer_dns = match source.get(PEER_DNS) {
            None => PeerDns::Unspecified,
            Some(_) if source.get_int(PEER_DNS) == 1 => PeerDns::Disabled,
            Some(_) => PeerDns::Enabled,
        };

        let params = Self {
            server,
            username: source.get(USERNAME),
            password: source.get(PASSWORD),
            default_route: source.get_int(DEFAULT_ROUTE) != 0,
            peer_dns,
            mtu_enable: source.get_int(MTU_ENABLE) != 0,
            mtu: read_size(source, MTU),
            mru_enable: source.get_int(MRU_ENABLE) != 0,
            mru: read_size(source, MRU),
            encryption: Encryption::from_code(source.get_int(CRYPT)),
            stateless: source.get_int(STATELESS) != 0,
            custom: source.get(CUSTOM).unwrap_or_default(),
            wan_proto: WanProto::parse(&source.get(WAN_PROTO).unwrap_or_default()),
        };

        debug!(
            "Read connection parameters: server={}, encryption={:?}, wan_proto={:?}",
            params.server, params.encryption, params.wan_proto
        );
        params
    }
}

fn read_size(source: &dyn ParameterSource, key: &str) -> Option<u32> {
    let raw = source.get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring non-numeric {key}={raw:?}: {e}");
            None
        }
    }
}

/// In-memory settings table.
#[derive(Debug, Default, Clone)]
pub struct MemoryParameterStore {
    values: HashMap<String, String>,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn unset(&mut self, key: &str) -> &mut Self {
        self.values.remove(key);
        self
    }
}

impl ParameterSource for MemoryParameterStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Settings table persisted as a flat TOML file.
#[derive(Debug, Default, Clone)]
pub struct TomlParameterStore {
    inner: MemoryParameterStore,
}

impl TomlParameterStore {
    /// Load the store; a missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            info!("Parameter file {:?} not found, every setting is unset", path);
            return Ok(Self::default());
        }

        debug!("Loading parameters from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let table: toml::Table = content.parse()?;
        let mut inner = MemoryParameterStore::new();

        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => (if b { "1" } else { "0" }).to_string(),
                toml::Value::Float(f) => f.to_string(),
                other => {
                    warn!("Skipping parameter {key}: unsupported value {other}");
                    continue;
                }
            };
            inner.set(key, text);
        }

        Ok(Self { inner })
    }

    /// Apply `key=value` overrides on top of the loaded table.
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        for (key, value) in overrides {
            self.inner.set(key, value);
        }
        self
    }
}

impl ParameterSource for TomlParameterStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }
}
