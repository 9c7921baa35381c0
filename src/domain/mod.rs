//! Core domain types and logic.

pub mod access;
pub mod config_validation;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod filter;
pub mod merge;
pub mod session;
pub mod settings;
