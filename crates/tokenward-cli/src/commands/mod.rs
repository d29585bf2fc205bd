//! CLI command implementations for tokenward.

pub mod keys;
pub mod token;
