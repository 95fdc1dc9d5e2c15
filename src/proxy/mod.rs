//! Proxy pipeline modules
//!
//! This module provides functionality for:
//! - Fetching proxy listings over HTTP
//! - Normalizing loosely-structured JSON and text listings
//! - Deduplicating and probing candidates for TCP reachability
//! - Rendering the survivors as a Surge configuration

pub mod checker;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod renderer;

pub use checker::{CheckerConfig, ProxyChecker};
pub use fetcher::{FetcherConfig, ProxyFetcher};
pub use models::{dedup_first_seen, Protocol, ProxyAuth, ProxyEntry};
pub use parser::ProxyParser;
pub use renderer::{render, OutputStyle};
