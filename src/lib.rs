//! proxy2surge - Proxy List to Surge Configuration
//!
//! Fetches a public proxy listing (JSON or plain text), normalizes and
//! deduplicates the entries, optionally probes each for TCP reachability,
//! and renders the survivors as a Surge proxy configuration.

pub mod config;
pub mod proxy;

pub use config::Config;
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
