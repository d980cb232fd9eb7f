#![allow(clippy::multiple_crate_versions)] // reqwest still pulls hyper 0.14 alongside axum's hyper 1

pub mod config;
pub mod dataset;
pub mod error;
pub mod modules;
pub mod server;
pub mod training;

pub use error::{ConnectorError, Result};
