use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to remove stale {path}: {source}")]
    RemoveStale { path: PathBuf, source: io::Error },
    #[error("failed to create working directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("link target {target} does not exist")]
    MissingTarget { target: PathBuf },
    #[error("failed to link {link} -> {target}: {source}")]
    Link {
        target: PathBuf,
        link: PathBuf,
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credentials: {}", missing_fields(.username, .password))]
    MissingCredentials { username: bool, password: bool },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: PathBuf, reason: String },
}

/// Every way `start` can fail. Scaffolding is always torn down before one of
/// these reaches the caller.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("scaffolding failure: {0}")]
    Scaffolding(#[from] WireError),
    #[error("missing required credentials: {}", missing_fields(.username, .password))]
    MissingCredentials { username: bool, password: bool },
    #[error("configuration failure: {0}")]
    Config(ConfigError),
    #[error("spawn failure: {0}")]
    Spawn(#[from] LaunchError),
}

impl From<ConfigError> for StartError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingCredentials { username, password } => {
                StartError::MissingCredentials { username, password }
            }
            other => StartError::Config(other),
        }
    }
}

fn missing_fields(username: &bool, password: &bool) -> String {
    match (*username, *password) {
        (true, true) => "username, password".to_string(),
        (true, false) => "username".to_string(),
        (false, true) => "password".to_string(),
        (false, false) => "none".to_string(),
    }
}
