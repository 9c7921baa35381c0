//! Configuration validation.
//!
//! Validates the `[server]` and `[client]` sections before anything is built
//! from them.

use crate::domain::error::TradestatsError;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";

pub fn validate_server_config(
    config: &dyn ConfigPort,
    token_override: Option<&str>,
) -> Result<(), TradestatsError> {
    validate_data_folder(config)?;
    validate_token(config, "server", token_override)?;
    validate_listen(config)?;
    validate_extension(config)?;
    Ok(())
}

/// The part of `[server]` a local workbench needs: no token, no listener.
pub fn validate_local_config(config: &dyn ConfigPort) -> Result<(), TradestatsError> {
    validate_data_folder(config)?;
    validate_extension(config)?;
    Ok(())
}

pub fn validate_client_config(
    config: &dyn ConfigPort,
    token_override: Option<&str>,
) -> Result<(), TradestatsError> {
    validate_base_url(config)?;
    validate_token(config, "client", token_override)?;
    validate_timeout(config)?;
    Ok(())
}

fn validate_data_folder(config: &dyn ConfigPort) -> Result<(), TradestatsError> {
    let folder = config
        .get_string("server", "data_folder")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TradestatsError::ConfigMissing {
            section: "server".to_string(),
            key: "data_folder".to_string(),
        })?;
    if !Path::new(folder.trim()).is_dir() {
        return Err(TradestatsError::ConfigInvalid {
            section: "server".to_string(),
            key: "data_folder".to_string(),
            reason: format!("{} is not a directory", folder.trim()),
        });
    }
    Ok(())
}

fn validate_token(
    config: &dyn ConfigPort,
    section: &str,
    token_override: Option<&str>,
) -> Result<(), TradestatsError> {
    if token_override.is_some_and(|t| !t.trim().is_empty()) {
        return Ok(());
    }
    match config.get_string(section, "api_token") {
        Some(t) if !t.trim().is_empty() => Ok(()),
        Some(_) => Err(TradestatsError::ConfigInvalid {
            section: section.to_string(),
            key: "api_token".to_string(),
            reason: "api_token must not be empty".to_string(),
        }),
        None => Err(TradestatsError::ConfigMissing {
            section: section.to_string(),
            key: "api_token".to_string(),
        }),
    }
}

fn validate_listen(config: &dyn ConfigPort) -> Result<(), TradestatsError> {
    let listen = config
        .get_string("server", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    if listen.trim().parse::<SocketAddr>().is_err() {
        return Err(TradestatsError::ConfigInvalid {
            section: "server".to_string(),
            key: "listen".to_string(),
            reason: format!("'{listen}' is not a socket address"),
        });
    }
    Ok(())
}

fn validate_extension(config: &dyn ConfigPort) -> Result<(), TradestatsError> {
    if let Some(ext) = config.get_string("server", "extension") {
        let ext = ext.trim();
        if !ext.is_empty() && (!ext.starts_with('.') || ext.contains('/')) {
            return Err(TradestatsError::ConfigInvalid {
                section: "server".to_string(),
                key: "extension".to_string(),
                reason: "extension must look like .csv".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_base_url(config: &dyn ConfigPort) -> Result<(), TradestatsError> {
    let url = config
        .get_string("client", "base_url")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TradestatsError::ConfigMissing {
            section: "client".to_string(),
            key: "base_url".to_string(),
        })?;
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(TradestatsError::ConfigInvalid {
            section: "client".to_string(),
            key: "base_url".to_string(),
            reason: "base_url must start with http:// or https://".to_string(),
        });
    }
    Ok(())
}

fn validate_timeout(config: &dyn ConfigPort) -> Result<(), TradestatsError> {
    let value = config.get_int("client", "timeout_secs", 30);
    if value <= 0 {
        return Err(TradestatsError::ConfigInvalid {
            section: "client".to_string(),
            key: "timeout_secs".to_string(),
            reason: "timeout_secs must be positive".to_string(),
        });
    }
    Ok(())
}
