//! Proxy data models

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Default city label for entries whose source does not carry one
pub const UNKNOWN_CITY: &str = "Unknown";

/// Proxy protocol enumeration
///
/// The allow-list is deliberately small: only protocols that Surge can
/// route through without extra parameters are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Socks5,
    Https,
}

impl Protocol {
    /// Lowercase protocol token as it appears in a Surge proxy line
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Socks5 => "socks5",
            Protocol::Https => "https",
        }
    }

    /// Uppercase token used in flat-style labels
    pub fn label_upper(&self) -> &'static str {
        match self {
            Protocol::Socks5 => "SOCKS5",
            Protocol::Https => "HTTPS",
        }
    }

    /// Mixed-case token used in grouped-style labels
    pub fn label_grouped(&self) -> &'static str {
        match self {
            Protocol::Socks5 => "Socks5",
            Protocol::Https => "HTTPS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Proxy authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl ProxyAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

/// A validated, canonical proxy entry
///
/// Constructed only by the parser; host, port and protocol are always
/// present and non-empty on a built entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEntry {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub auth: Option<ProxyAuth>,
    pub city: String,
}

impl ProxyEntry {
    /// Create a new entry without authentication
    pub fn new(host: String, port: u16, protocol: Protocol) -> Self {
        Self {
            host,
            port,
            protocol,
            auth: None,
            city: UNKNOWN_CITY.to_string(),
        }
    }

    /// Create a new entry with authentication
    pub fn with_auth(
        host: String,
        port: u16,
        protocol: Protocol,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host,
            port,
            protocol,
            auth: Some(ProxyAuth::new(username, password)),
            city: UNKNOWN_CITY.to_string(),
        }
    }

    /// Attach a city label
    pub fn with_city(mut self, city: String) -> Self {
        self.city = city;
        self
    }

    /// Get the entry in host:port form
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Collapse entries sharing an identity key, keeping the first occurrence
/// per key in original order.
///
/// The identity key is `(host, port, protocol)`, extended with `city` when
/// `city_aware` is set (grouped output must not merge entries that would
/// land in different groups).
pub fn dedup_first_seen(entries: Vec<ProxyEntry>, city_aware: bool) -> Vec<ProxyEntry> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(entries.len());

    for entry in entries {
        let city = city_aware.then(|| entry.city.clone());
        let key = (entry.host.clone(), entry.port, entry.protocol, city);
        if seen.insert(key) {
            unique.push(entry);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = ProxyEntry::new("127.0.0.1".to_string(), 1080, Protocol::Socks5);
        assert_eq!(entry.host, "127.0.0.1");
        assert_eq!(entry.port, 1080);
        assert_eq!(entry.protocol, Protocol::Socks5);
        assert!(entry.auth.is_none());
        assert_eq!(entry.city, UNKNOWN_CITY);
        assert_eq!(entry.to_string(), "socks5://127.0.0.1:1080");
        assert_eq!(entry.to_simple_string(), "127.0.0.1:1080");
    }

    #[test]
    fn test_entry_with_auth() {
        let entry = ProxyEntry::with_auth(
            "127.0.0.1".to_string(),
            1080,
            Protocol::Socks5,
            "user".to_string(),
            "pass".to_string(),
        );
        let auth = entry.auth.unwrap();
        assert_eq!(auth.username, "user");
        assert_eq!(auth.password, "pass");
    }

    #[test]
    fn test_entry_with_city() {
        let entry = ProxyEntry::new("10.0.0.1".to_string(), 443, Protocol::Https)
            .with_city("Shanghai".to_string());
        assert_eq!(entry.city, "Shanghai");
    }

    #[test]
    fn test_protocol_labels() {
        assert_eq!(Protocol::Socks5.as_str(), "socks5");
        assert_eq!(Protocol::Https.as_str(), "https");
        assert_eq!(Protocol::Socks5.label_upper(), "SOCKS5");
        assert_eq!(Protocol::Https.label_grouped(), "HTTPS");
    }

    #[test]
    fn test_dedup_first_seen_wins() {
        let first = ProxyEntry::with_auth(
            "1.2.3.4".to_string(),
            1080,
            Protocol::Socks5,
            "a".to_string(),
            "b".to_string(),
        );
        let duplicate = ProxyEntry::new("1.2.3.4".to_string(), 1080, Protocol::Socks5);
        let other = ProxyEntry::new("1.2.3.4".to_string(), 1081, Protocol::Socks5);

        let unique = dedup_first_seen(vec![first.clone(), duplicate, other.clone()], false);
        assert_eq!(unique, vec![first, other]);
    }

    #[test]
    fn test_dedup_city_aware() {
        let shanghai = ProxyEntry::new("1.2.3.4".to_string(), 1080, Protocol::Socks5)
            .with_city("Shanghai".to_string());
        let beijing = ProxyEntry::new("1.2.3.4".to_string(), 1080, Protocol::Socks5)
            .with_city("Beijing".to_string());

        // Distinct with city in the key, merged without
        let both = vec![shanghai.clone(), beijing.clone()];
        assert_eq!(dedup_first_seen(both.clone(), true).len(), 2);
        assert_eq!(dedup_first_seen(both, false), vec![shanghai]);
    }

    #[test]
    fn test_dedup_idempotent() {
        let entries = vec![
            ProxyEntry::new("1.2.3.4".to_string(), 1080, Protocol::Socks5),
            ProxyEntry::new("1.2.3.4".to_string(), 1080, Protocol::Socks5),
            ProxyEntry::new("5.6.7.8".to_string(), 443, Protocol::Https),
        ];
        let once = dedup_first_seen(entries, false);
        let twice = dedup_first_seen(once.clone(), false);
        assert_eq!(once, twice);
    }
}
