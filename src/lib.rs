//! tradestats: a token-protected file service for trade-statistics CSV files
//! and a workbench that filters, merges and derives metrics over them.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command dispatch in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
