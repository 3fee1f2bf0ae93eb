//! SQLite-backed cache buckets.
//!
//! A bucket is a named mapping from request URL to a captured response.
//! This module provides:
//!
//! - Bucket lifecycle: open (create if absent), enumerate, delete
//! - Entry storage keyed by a SHA-256 hash of the canonical request URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, ResponseType};
