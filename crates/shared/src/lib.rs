//! Shared types, errors, and configuration for Starlift.
//!
//! This crate provides common types used across all other crates:
//! - Typed surrogate keys for type-safe dimension references
//! - Application-wide error taxonomy
//! - Configuration management
//! - Bounded retry with backoff for transient failures

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::EtlConfig;
pub use error::{EtlError, EtlResult};
