//! Network access for offline-proxy.
//!
//! This crate provides the HTTP fetch client, the `Network` seam the worker
//! fetches through, and URL/origin handling.

pub mod fetch;

pub use fetch::{AppOrigin, FetchClient, FetchConfig, FetchResponse, Network, UrlError, canonicalize, classify};

pub use reqwest::{Method, StatusCode, header};
