//! Core modules for aws-ec-info.
//!
//! - [`cache_explorer`] discovers Global Datastores and queries every involved region
//! - [`fields`] and [`formatters`] turn records into CSV or Markdown tables
//! - [`config`] loads the optional TOML configuration
//! - [`error`] holds the classified, user-facing error kinds

pub mod cache_explorer;
pub mod config;
pub mod error;
pub mod fields;
pub mod formatters;
