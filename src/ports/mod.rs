//! Port traits implemented by adapters.

pub mod catalog_port;
pub mod config_port;
pub mod dataset_source;
