//! # tokenward-core
//!
//! Configuration types shared by the tokenward crates.

pub mod config;

pub use config::{ConfigError, SigningConfig, TokenwardConfig, VerifyConfig};
