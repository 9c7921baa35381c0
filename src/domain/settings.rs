//! Typed settings built from validated configuration.

use crate::domain::config_validation::{
    DEFAULT_LISTEN, validate_client_config, validate_local_config, validate_server_config,
};
use crate::domain::error::TradestatsError;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding `api_token` in both sections.
pub const TOKEN_ENV: &str = "TRADESTATS_API_TOKEN";

pub const DEFAULT_EXTENSION: &str = ".csv";
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub data_folder: PathBuf,
    pub api_token: String,
    pub listen: SocketAddr,
    pub extension: String,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_token: String,
    pub timeout: Duration,
}

/// Data root read directly by the workbench when no remote service is configured.
#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub data_folder: PathBuf,
    pub extension: String,
}

fn token(config: &dyn ConfigPort, section: &str, token_override: Option<&str>) -> String {
    token_override
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .or_else(|| config.get_string(section, "api_token"))
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub fn server_settings(
    config: &dyn ConfigPort,
    token_override: Option<&str>,
) -> Result<ServerSettings, TradestatsError> {
    validate_server_config(config, token_override)?;

    let data_folder = data_folder(config);
    let listen: SocketAddr = config
        .get_string("server", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string())
        .trim()
        .parse()
        .map_err(|_| TradestatsError::ConfigInvalid {
            section: "server".into(),
            key: "listen".into(),
            reason: "not a socket address".into(),
        })?;

    Ok(ServerSettings {
        data_folder,
        api_token: token(config, "server", token_override),
        listen,
        extension: extension(config),
    })
}

fn data_folder(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("server", "data_folder")
            .unwrap_or_default()
            .trim(),
    )
}

fn extension(config: &dyn ConfigPort) -> String {
    config
        .get_string("server", "extension")
        .map(|e| e.trim().to_string())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

pub fn local_settings(config: &dyn ConfigPort) -> Result<LocalSettings, TradestatsError> {
    validate_local_config(config)?;
    Ok(LocalSettings {
        data_folder: data_folder(config),
        extension: extension(config),
    })
}

/// `Ok(None)` when no `[client] base_url` is configured.
pub fn client_settings(
    config: &dyn ConfigPort,
    token_override: Option<&str>,
) -> Result<Option<ClientSettings>, TradestatsError> {
    if config
        .get_string("client", "base_url")
        .is_none_or(|u| u.trim().is_empty())
    {
        return Ok(None);
    }
    validate_client_config(config, token_override)?;

    let base_url = config
        .get_string("client", "base_url")
        .unwrap_or_default()
        .trim()
        .trim_end_matches('/')
        .to_string();
    let secs = config.get_int("client", "timeout_secs", DEFAULT_TIMEOUT_SECS);

    Ok(Some(ClientSettings {
        base_url,
        api_token: token(config, "client", token_override),
        timeout: Duration::from_secs(secs as u64),
    }))
}
