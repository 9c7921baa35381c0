//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod fs_catalog;
#[cfg(feature = "client")]
pub mod http_source;
#[cfg(feature = "web")]
pub mod web;
