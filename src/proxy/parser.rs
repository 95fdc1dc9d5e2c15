//! Proxy parser module for normalizing loosely-structured proxy listings
//!
//! Free proxy-list APIs are wildly inconsistent: field names differ per
//! provider, ports arrive as strings or numbers, and some endpoints serve
//! plain text instead of JSON. Everything here funnels that mess into
//! canonical [`ProxyEntry`] values, dropping whatever cannot be resolved.

use crate::proxy::models::{Protocol, ProxyEntry, UNKNOWN_CITY};
use crate::Result;
use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Wrapper keys that commonly hold the record list in JSON responses,
/// tried in priority order
const CONTAINER_KEYS: [&str; 5] = ["data", "list", "result", "items", "proxies"];

/// Field-name aliases for the proxy host, first non-empty wins
const HOST_FIELDS: [&str; 5] = ["ip", "host", "address", "server", "addr"];

/// Field-name aliases for the protocol token
const PROTOCOL_FIELDS: [&str; 4] = ["type", "protocol", "scheme", "proxy_type"];

const USERNAME_FIELDS: [&str; 2] = ["username", "user"];
const PASSWORD_FIELDS: [&str; 2] = ["password", "pass"];

/// Strict IPv4 dotted-quad pattern
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}$").expect("Invalid IPv4 regex"));

/// Generic hostname-like token: no whitespace, colon or @
static HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s:@]+$").expect("Invalid host regex"));

/// user:pass@host:port
static AUTH_AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:@\s]+):([^@\s]+)@([^\s:@]+):(\d{1,5})$").expect("Invalid auth@ regex")
});

/// host:port:user:pass
static COLON_AUTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s:@]+):(\d{1,5}):([^:@\s]+):([^:@\s]+)$").expect("Invalid colon regex")
});

/// host:port
static HOST_PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\s:@]+):(\d{1,5})$").expect("Invalid host:port regex"));

/// Proxy parser for normalizing JSON and line-oriented proxy listings
pub struct ProxyParser;

impl ProxyParser {
    /// Locate the list of raw records inside a JSON response body.
    ///
    /// Returns `None` when the body is not JSON (the caller may then fall
    /// back to line-oriented parsing); an unrecognized but valid JSON
    /// shape yields an empty list. Parse failure is an expected outcome
    /// here, never an error.
    pub fn extract_records(text: &str) -> Option<Vec<Value>> {
        let parsed: Value = serde_json::from_str(text).ok()?;

        match parsed {
            Value::Array(records) => Some(records),
            Value::Object(mut map) => {
                for key in CONTAINER_KEYS {
                    if matches!(map.get(key), Some(Value::Array(_))) {
                        if let Some(Value::Array(records)) = map.remove(key) {
                            return Some(records);
                        }
                    }
                }
                // No known container key: take the first array-valued member
                for (_, value) in map {
                    if let Value::Array(records) = value {
                        return Some(records);
                    }
                }
                Some(Vec::new())
            }
            _ => None,
        }
    }

    /// Normalize a single JSON record into a canonical entry.
    ///
    /// Records missing a resolvable host, port or protocol are rejected,
    /// as are hosts failing both the IPv4 and generic token patterns.
    pub fn parse_json_record(record: &Value) -> Option<ProxyEntry> {
        let host = Self::first_string(record, &HOST_FIELDS)?;
        if !(IPV4_RE.is_match(&host) || HOST_RE.is_match(&host)) {
            return None;
        }

        let port = Self::resolve_port(record)?;
        let protocol = Self::resolve_protocol(record)?;
        let city =
            Self::first_string(record, &["city"]).unwrap_or_else(|| UNKNOWN_CITY.to_string());

        // Credentials only count as a pair
        let username = Self::first_string(record, &USERNAME_FIELDS);
        let password = Self::first_string(record, &PASSWORD_FIELDS);
        let entry = match (username, password) {
            (Some(user), Some(pass)) => ProxyEntry::with_auth(host, port, protocol, user, pass),
            _ => ProxyEntry::new(host, port, protocol),
        };

        Some(entry.with_city(city))
    }

    /// Normalize a list of JSON records, discarding malformed ones
    pub fn parse_json_records(records: &[Value]) -> Vec<ProxyEntry> {
        let entries: Vec<ProxyEntry> = records
            .iter()
            .filter_map(Self::parse_json_record)
            .collect();

        let skipped = records.len() - entries.len();
        if skipped > 0 {
            log::debug!("skipped {} malformed records", skipped);
        }

        entries
    }

    /// Parse a single proxy line
    ///
    /// Supported grammars, tried in order:
    /// - USER:PASS@HOST:PORT
    /// - HOST:PORT:USER:PASS
    /// - HOST:PORT
    ///
    /// The protocol is inferred from a case-insensitive token search over
    /// the whole line; lines without a token use `default_protocol`, or
    /// are dropped when no default is configured.
    pub fn parse_line(line: &str, default_protocol: Option<Protocol>) -> Option<ProxyEntry> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let protocol = match Self::infer_line_protocol(line) {
            Some(protocol) => protocol,
            None => default_protocol?,
        };

        // Protocol annotations ("1.2.3.4:443 https") are not part of the
        // address, so try each whitespace-separated token in turn
        line.split_whitespace().find_map(|spec| {
            Self::parse_auth_at_format(spec, protocol)
                .or_else(|| Self::parse_colon_auth_format(spec, protocol))
                .or_else(|| Self::parse_host_port_format(spec, protocol))
        })
    }

    /// Parse proxies from line-oriented content (multiple lines)
    pub fn parse_text(content: &str, default_protocol: Option<Protocol>) -> Vec<ProxyEntry> {
        content
            .lines()
            .filter_map(|line| Self::parse_line(line, default_protocol))
            .collect()
    }

    /// Parse a raw response body, detecting its format.
    ///
    /// JSON bodies go through the record normalizer; non-JSON bodies fall
    /// back to line-oriented parsing when `text_fallback` is set, and are
    /// an error otherwise.
    pub fn parse_body(
        body: &str,
        text_fallback: bool,
        default_protocol: Option<Protocol>,
    ) -> Result<Vec<ProxyEntry>> {
        match Self::extract_records(body) {
            Some(records) => Ok(Self::parse_json_records(&records)),
            None if text_fallback => Ok(Self::parse_text(body, default_protocol)),
            None => Err(anyhow!("response body is not valid JSON")),
        }
    }

    /// Classify a protocol token against the allow-list
    pub fn classify_token(token: &str) -> Option<Protocol> {
        let token = token.trim().to_lowercase();
        if token.starts_with("socks5") || token == "socks" {
            Some(Protocol::Socks5)
        } else if token == "https" {
            Some(Protocol::Https)
        } else {
            None
        }
    }

    /// First present, non-empty string among the given alias fields
    fn first_string(record: &Value, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|field| {
            record
                .get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }

    /// Coerce the port field from a JSON number or numeric string
    fn resolve_port(record: &Value) -> Option<u16> {
        let port = match record.get("port")? {
            Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
            Value::String(s) => s.trim().parse::<u16>().ok()?,
            _ => return None,
        };
        (port != 0).then_some(port)
    }

    /// Resolve the protocol across alias fields and the `protocols` list
    fn resolve_protocol(record: &Value) -> Option<Protocol> {
        if let Some(list) = record.get("protocols").and_then(Value::as_array) {
            if let Some(protocol) = Self::protocol_from_list(list) {
                return Some(protocol);
            }
        }

        for field in PROTOCOL_FIELDS {
            if let Some(protocol) = record
                .get(field)
                .and_then(Value::as_str)
                .and_then(Self::classify_token)
            {
                return Some(protocol);
            }
        }

        None
    }

    /// Pick a protocol from a list of tokens, socks5 outranking https
    fn protocol_from_list(list: &[Value]) -> Option<Protocol> {
        let mut https_seen = false;
        for token in list.iter().filter_map(Value::as_str) {
            match Self::classify_token(token) {
                Some(Protocol::Socks5) => return Some(Protocol::Socks5),
                Some(Protocol::Https) => https_seen = true,
                None => {}
            }
        }
        https_seen.then_some(Protocol::Https)
    }

    /// Infer a line's protocol by substring search over the raw text
    fn infer_line_protocol(line: &str) -> Option<Protocol> {
        let lower = line.to_lowercase();
        if lower.contains("socks5") {
            Some(Protocol::Socks5)
        } else if lower.contains("https") {
            Some(Protocol::Https)
        } else {
            None
        }
    }

    /// Parse USER:PASS@HOST:PORT
    fn parse_auth_at_format(spec: &str, protocol: Protocol) -> Option<ProxyEntry> {
        let caps = AUTH_AT_RE.captures(spec)?;
        let port = Self::parse_port_str(&caps[4])?;
        Some(ProxyEntry::with_auth(
            caps[3].to_string(),
            port,
            protocol,
            caps[1].to_string(),
            caps[2].to_string(),
        ))
    }

    /// Parse HOST:PORT:USER:PASS
    fn parse_colon_auth_format(spec: &str, protocol: Protocol) -> Option<ProxyEntry> {
        let caps = COLON_AUTH_RE.captures(spec)?;
        let port = Self::parse_port_str(&caps[2])?;
        Some(ProxyEntry::with_auth(
            caps[1].to_string(),
            port,
            protocol,
            caps[3].to_string(),
            caps[4].to_string(),
        ))
    }

    /// Parse HOST:PORT
    fn parse_host_port_format(spec: &str, protocol: Protocol) -> Option<ProxyEntry> {
        let caps = HOST_PORT_RE.captures(spec)?;
        let port = Self::parse_port_str(&caps[2])?;
        Some(ProxyEntry::new(caps[1].to_string(), port, protocol))
    }

    fn parse_port_str(s: &str) -> Option<u16> {
        let port = s.parse::<u16>().ok()?;
        (port != 0).then_some(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_records_container_keys() {
        let records =
            ProxyParser::extract_records(r#"{"data":[{"ip":"1.2.3.4"}],"list":[]}"#).unwrap();
        assert_eq!(records.len(), 1);

        let records = ProxyParser::extract_records(r#"{"proxies":[1,2,3]}"#).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_extract_records_first_array_fallback() {
        let records =
            ProxyParser::extract_records(r#"{"meta":{"page":1},"rows":[{"ip":"1.2.3.4"}]}"#)
                .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_extract_records_top_level_array() {
        let records = ProxyParser::extract_records(r#"[{"ip":"1.2.3.4"}]"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_extract_records_no_array() {
        let records = ProxyParser::extract_records(r#"{"count":5}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_extract_records_not_json() {
        assert!(ProxyParser::extract_records("1.2.3.4:1080\n5.6.7.8:443").is_none());
    }

    #[test]
    fn test_parse_json_record_host_aliases() {
        for field in HOST_FIELDS {
            let record = json!({field: "1.2.3.4", "port": 1080, "type": "socks5"});
            let entry = ProxyParser::parse_json_record(&record).unwrap();
            assert_eq!(entry.host, "1.2.3.4");
        }
    }

    #[test]
    fn test_parse_json_record_port_coercion() {
        let record = json!({"ip": "1.2.3.4", "port": "1080", "type": "socks5"});
        assert_eq!(ProxyParser::parse_json_record(&record).unwrap().port, 1080);

        let record = json!({"ip": "1.2.3.4", "port": 1080, "type": "socks5"});
        assert_eq!(ProxyParser::parse_json_record(&record).unwrap().port, 1080);

        for bad in [json!("80k"), json!(0), json!(70000), json!(null)] {
            let record = json!({"ip": "1.2.3.4", "port": bad, "type": "socks5"});
            assert!(ProxyParser::parse_json_record(&record).is_none());
        }
    }

    #[test]
    fn test_parse_json_record_protocols_list_prefers_socks5() {
        let record = json!({"ip": "1.2.3.4", "port": 1080, "protocols": ["https", "socks5"]});
        let entry = ProxyParser::parse_json_record(&record).unwrap();
        assert_eq!(entry.protocol, Protocol::Socks5);
    }

    #[test]
    fn test_parse_json_record_protocol_alias_chain() {
        // Unrecognized `type` falls through to `protocol`
        let record = json!({"ip": "1.2.3.4", "port": 443, "type": "vmess", "protocol": "https"});
        let entry = ProxyParser::parse_json_record(&record).unwrap();
        assert_eq!(entry.protocol, Protocol::Https);
    }

    #[test]
    fn test_parse_json_record_no_protocol() {
        let record = json!({"ip": "1.2.3.4", "port": 1080, "type": "vmess"});
        assert!(ProxyParser::parse_json_record(&record).is_none());

        let record = json!({"ip": "1.2.3.4", "port": 1080});
        assert!(ProxyParser::parse_json_record(&record).is_none());
    }

    #[test]
    fn test_parse_json_record_bad_host() {
        let record = json!({"ip": "bad host", "port": 80, "type": "https"});
        assert!(ProxyParser::parse_json_record(&record).is_none());

        let record = json!({"ip": "a@b", "port": 80, "type": "https"});
        assert!(ProxyParser::parse_json_record(&record).is_none());
    }

    #[test]
    fn test_parse_json_record_credentials_pair_only() {
        let record = json!({
            "ip": "1.2.3.4", "port": 1080, "type": "socks5",
            "username": "u", "password": "p"
        });
        assert!(ProxyParser::parse_json_record(&record).unwrap().auth.is_some());

        // A lone username is not emitted
        let record = json!({"ip": "1.2.3.4", "port": 1080, "type": "socks5", "user": "u"});
        assert!(ProxyParser::parse_json_record(&record).unwrap().auth.is_none());
    }

    #[test]
    fn test_parse_json_record_city_default() {
        let record = json!({"ip": "1.2.3.4", "port": 1080, "type": "socks5"});
        assert_eq!(ProxyParser::parse_json_record(&record).unwrap().city, "Unknown");

        let record = json!({"ip": "1.2.3.4", "port": 1080, "type": "socks5", "city": "Wuhan"});
        assert_eq!(ProxyParser::parse_json_record(&record).unwrap().city, "Wuhan");
    }

    #[test]
    fn test_classify_token() {
        assert_eq!(ProxyParser::classify_token("socks5"), Some(Protocol::Socks5));
        assert_eq!(ProxyParser::classify_token("SOCKS5H"), Some(Protocol::Socks5));
        assert_eq!(ProxyParser::classify_token("socks"), Some(Protocol::Socks5));
        assert_eq!(ProxyParser::classify_token("https"), Some(Protocol::Https));
        assert_eq!(ProxyParser::classify_token("http"), None);
        assert_eq!(ProxyParser::classify_token("socks4"), None);
        assert_eq!(ProxyParser::classify_token("vmess"), None);
    }

    #[test]
    fn test_parse_line_host_port() {
        let entry = ProxyParser::parse_line("1.2.3.4:1080", Some(Protocol::Socks5)).unwrap();
        assert_eq!(entry.host, "1.2.3.4");
        assert_eq!(entry.port, 1080);
        assert_eq!(entry.protocol, Protocol::Socks5);
        assert!(entry.auth.is_none());
    }

    #[test]
    fn test_parse_line_auth_at() {
        let entry =
            ProxyParser::parse_line("user:pass@1.2.3.4:1080", Some(Protocol::Socks5)).unwrap();
        assert_eq!(entry.host, "1.2.3.4");
        let auth = entry.auth.unwrap();
        assert_eq!(auth.username, "user");
        assert_eq!(auth.password, "pass");
    }

    #[test]
    fn test_parse_line_colon_auth() {
        let entry =
            ProxyParser::parse_line("1.2.3.4:1080:user:pass", Some(Protocol::Socks5)).unwrap();
        assert_eq!(entry.host, "1.2.3.4");
        assert_eq!(entry.port, 1080);
        assert!(entry.auth.is_some());
    }

    #[test]
    fn test_parse_line_protocol_annotation() {
        let entry = ProxyParser::parse_line("1.2.3.4:443 https", Some(Protocol::Socks5)).unwrap();
        assert_eq!(entry.protocol, Protocol::Https);

        let entry = ProxyParser::parse_line("socks5 1.2.3.4:1080", None).unwrap();
        assert_eq!(entry.protocol, Protocol::Socks5);
    }

    #[test]
    fn test_parse_line_no_token_no_default() {
        assert!(ProxyParser::parse_line("1.2.3.4:1080", None).is_none());
    }

    #[test]
    fn test_parse_line_skips_comments_and_blanks() {
        assert!(ProxyParser::parse_line("", Some(Protocol::Socks5)).is_none());
        assert!(ProxyParser::parse_line("# comment", Some(Protocol::Socks5)).is_none());
    }

    #[test]
    fn test_parse_line_invalid() {
        assert!(ProxyParser::parse_line("not a proxy", Some(Protocol::Socks5)).is_none());
        assert!(ProxyParser::parse_line("1.2.3.4", Some(Protocol::Socks5)).is_none());
        assert!(ProxyParser::parse_line("1.2.3.4:abc", Some(Protocol::Socks5)).is_none());
        assert!(ProxyParser::parse_line("1.2.3.4:0", Some(Protocol::Socks5)).is_none());
        assert!(ProxyParser::parse_line("1.2.3.4:99999", Some(Protocol::Socks5)).is_none());
    }

    #[test]
    fn test_parse_text() {
        let content = "user1:pass1@10.0.0.1:1080\n# comment\n10.0.0.2:443 https\n";
        let entries = ProxyParser::parse_text(content, Some(Protocol::Socks5));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].protocol, Protocol::Socks5);
        assert!(entries[0].auth.is_some());
        assert_eq!(entries[1].protocol, Protocol::Https);
        assert!(entries[1].auth.is_none());
    }

    #[test]
    fn test_parse_body_json() {
        let body = r#"{"data":[{"ip":"1.2.3.4","port":"1080","type":"socks5"}]}"#;
        let entries = ProxyParser::parse_body(body, true, Some(Protocol::Socks5)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_parse_body_text_fallback() {
        let entries =
            ProxyParser::parse_body("1.2.3.4:1080\n", true, Some(Protocol::Socks5)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_parse_body_strict_rejects_text() {
        assert!(ProxyParser::parse_body("1.2.3.4:1080\n", false, Some(Protocol::Socks5)).is_err());
    }
}
