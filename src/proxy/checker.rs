//! Connectivity filter for probing proxy candidates
//!
//! A probe is a bare TCP connect with a bounded timeout. It is a liveness
//! check only: a reachable port says nothing about whether the proxy
//! protocol behind it actually works.

use crate::proxy::models::ProxyEntry;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;

/// Default timeout for each connect probe in milliseconds
const DEFAULT_TIMEOUT_MS: u64 = 1500;

/// Default number of concurrent probes
const DEFAULT_CONCURRENCY: usize = 16;

/// Configuration for the connectivity checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each connect probe
    pub timeout: Duration,
    /// Number of concurrent probes
    pub concurrency: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Connectivity checker for filtering unreachable proxy candidates
pub struct ProxyChecker {
    config: CheckerConfig,
}

impl ProxyChecker {
    /// Create a new checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    /// Probe a single host:port with a bounded-timeout TCP connect.
    ///
    /// Every failure cause (refused, timeout, unreachable, DNS) counts
    /// the same: the candidate is simply not reachable.
    pub async fn probe(&self, host: &str, port: u16) -> bool {
        matches!(
            tokio::time::timeout(self.config.timeout, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }

    /// Filter candidates down to the reachable ones.
    ///
    /// Probes run concurrently on a bounded pool, but results are joined
    /// back in original candidate order so the output stays deterministic.
    pub async fn filter_reachable(&self, entries: Vec<ProxyEntry>) -> Vec<ProxyEntry> {
        let results = stream::iter(entries)
            .map(|entry| async move {
                let reachable = self.probe(&entry.host, entry.port).await;
                (entry, reachable)
            })
            .buffered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await;

        results
            .into_iter()
            .filter_map(|(entry, reachable)| {
                if reachable {
                    Some(entry)
                } else {
                    log::debug!("dropping unreachable candidate {}", entry.to_simple_string());
                    None
                }
            })
            .collect()
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}
