//! Configuration module for spritealign
//!
//! Provides types and parsing for the optional `spritealign.toml` file.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_cli_overrides, CliOverrides, ConfigError};
pub use schema::*;
