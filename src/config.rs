//! Runtime configuration
//!
//! Built once at process start from environment variables (every key is
//! optional and has a default), then passed down to the pipeline. CLI
//! flags may override individual fields afterwards.

use crate::proxy::models::Protocol;
use crate::proxy::renderer::{OutputStyle, DEFAULT_TAG};
use std::env;
use std::time::Duration;

const DEFAULT_API_URL: &str =
    "https://proxyfreeonly.com/api/free-proxy-list?limit=500&page=1&sortBy=lastChecked&sortType=desc";
const DEFAULT_OUTPUT_FILENAME: &str = "Surge-Proxies.conf";
const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 1.5;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PROBE_CONCURRENCY: usize = 16;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Source URL for the proxy listing
    pub api_url: String,
    /// Final output size cap, applied after probing; 0 means unlimited
    pub max_nodes: usize,
    /// Candidate cap applied before probing; 0 means unlimited
    pub candidate_limit: usize,
    /// Whether to probe candidates for TCP reachability
    pub test_connectivity: bool,
    /// Timeout for each connect probe
    pub connect_timeout: Duration,
    /// Number of concurrent probes
    pub probe_concurrency: usize,
    /// Timeout for the HTTP fetch
    pub fetch_timeout: Duration,
    /// Output file name
    pub output_file: String,
    /// Output style for the [Proxy] section
    pub output_style: OutputStyle,
    /// Label prefix for generated proxy names
    pub group_tag: String,
    /// Protocol assumed for text lines without a protocol token;
    /// None drops such lines instead
    pub default_protocol: Option<Protocol>,
    /// Whether a non-JSON body falls back to line-oriented parsing
    pub text_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            max_nodes: 0,
            candidate_limit: 0,
            test_connectivity: true,
            connect_timeout: Duration::from_secs_f64(DEFAULT_CONNECT_TIMEOUT_SECS),
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            output_file: DEFAULT_OUTPUT_FILENAME.to_string(),
            output_style: OutputStyle::GroupedByCity,
            group_tag: DEFAULT_TAG.to_string(),
            default_protocol: Some(Protocol::Socks5),
            text_fallback: true,
        }
    }
}

impl Config {
    /// Build the configuration from environment variables, falling back
    /// to defaults for anything unset or unparseable
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_url: string_var("PROXY_API_URL", defaults.api_url),
            max_nodes: parsed_var("MAX_NODES", defaults.max_nodes),
            candidate_limit: parsed_var("CANDIDATE_LIMIT", defaults.candidate_limit),
            test_connectivity: bool_var("TEST_CONNECTIVITY", defaults.test_connectivity),
            connect_timeout: env::var("CONNECT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|secs| *secs > 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.connect_timeout),
            probe_concurrency: parsed_var("PROBE_CONCURRENCY", defaults.probe_concurrency).max(1),
            fetch_timeout: env::var("FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            output_file: string_var("OUTPUT_FILENAME", defaults.output_file),
            output_style: env::var("OUTPUT_STYLE")
                .ok()
                .and_then(|v| parse_output_style(&v))
                .unwrap_or(defaults.output_style),
            group_tag: string_var("GROUP_TAG", defaults.group_tag),
            default_protocol: match env::var("DEFAULT_PROTOCOL") {
                Ok(v) => parse_default_protocol(&v),
                Err(_) => defaults.default_protocol,
            },
            text_fallback: bool_var("TEXT_FALLBACK", defaults.text_fallback),
        }
    }
}

/// Parse an output style name; unknown names are ignored
pub fn parse_output_style(value: &str) -> Option<OutputStyle> {
    match value.trim().to_lowercase().as_str() {
        "flat" => Some(OutputStyle::Flat),
        "grouped" | "city" => Some(OutputStyle::GroupedByCity),
        _ => None,
    }
}

fn parse_default_protocol(value: &str) -> Option<Protocol> {
    match value.trim().to_lowercase().as_str() {
        "socks5" => Some(Protocol::Socks5),
        "https" => Some(Protocol::Https),
        // "none" (or anything unrecognized) drops untagged lines
        _ => None,
    }
}

fn string_var(key: &str, default: String) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn bool_var(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => v.trim().to_lowercase() == "true",
        Err(_) => default,
    }
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
