//! Configuration module for the connector
//!
//! Loads config from `$XDG_CONFIG_HOME/annotix-connector/config.toml` or
//! `~/.config/annotix-connector/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.

pub mod schema;

pub use schema::Config;
