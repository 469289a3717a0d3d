//! Tally Common - Shared types and utilities
//!
//! This crate provides the common types, error definitions, and
//! configuration used across all Tally components.

pub mod config;
pub mod error;
pub mod types;

pub use config::CounterConfig;
pub use error::{Error, Result};
pub use types::*;
