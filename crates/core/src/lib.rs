//! Core types and shared functionality for offline-proxy.
//!
//! This crate provides:
//! - Versioned cache buckets with a SQLite backend
//! - The precache manifest and bucket naming
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CachedResponse, ResponseType};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
