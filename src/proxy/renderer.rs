//! Surge configuration renderer
//!
//! Turns the surviving entries into a `[Proxy]` / `[Proxy Group]` /
//! `[Rule]` configuration. All proxy lines share one canonical shape:
//! `name = protocol, host, port[, username=<u>, password=<p>]`.

use crate::proxy::models::{Protocol, ProxyEntry};
use std::collections::HashMap;

/// Default label prefix for generated proxy names
pub const DEFAULT_TAG: &str = "Proxy";

/// Output style for the `[Proxy]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    /// One line per entry, labeled `<TAG>-<PROTO>-<index>`
    Flat,
    /// Entries grouped by `(city, protocol)`, socks5 groups first
    GroupedByCity,
}

/// Render the full configuration text for the surviving entries
pub fn render(entries: &[ProxyEntry], style: OutputStyle, tag: &str) -> String {
    let mut lines = vec!["[Proxy]".to_string()];

    let names = match style {
        OutputStyle::Flat => render_flat(entries, tag, &mut lines),
        OutputStyle::GroupedByCity => render_grouped(entries, tag, &mut lines),
    };

    lines.push(String::new());
    lines.push("[Proxy Group]".to_string());
    let mut group = String::from("Proxy = select");
    for name in &names {
        group.push_str(", ");
        group.push_str(name);
    }
    group.push_str(", DIRECT");
    lines.push(group);

    lines.push(String::new());
    lines.push("[Rule]".to_string());
    lines.push("FINAL,Proxy".to_string());

    lines.join("\n") + "\n"
}

/// Normalize a city label for use in proxy names: title case, spaces removed
pub fn format_city(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect()
}

fn render_flat(entries: &[ProxyEntry], tag: &str, lines: &mut Vec<String>) -> Vec<String> {
    let mut names = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let name = format!("{}-{}-{}", tag, entry.protocol.label_upper(), index + 1);
        lines.push(proxy_line(&name, entry));
        names.push(name);
    }

    names
}

fn render_grouped(entries: &[ProxyEntry], tag: &str, lines: &mut Vec<String>) -> Vec<String> {
    // Group by (city, protocol), remembering first-seen group order
    let mut order: Vec<(String, Protocol)> = Vec::new();
    let mut groups: HashMap<(String, Protocol), Vec<&ProxyEntry>> = HashMap::new();

    for entry in entries {
        let key = (format_city(&entry.city), entry.protocol);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(entry);
    }

    let mut names = Vec::with_capacity(entries.len());

    // Two passes: every socks5 group, then every https group
    for protocol in [Protocol::Socks5, Protocol::Https] {
        for key in order.iter().filter(|(_, p)| *p == protocol) {
            for (index, entry) in groups[key].iter().enumerate() {
                let name = format!(
                    "{} {} {} {:02}",
                    tag,
                    key.0,
                    protocol.label_grouped(),
                    index + 1
                );
                lines.push(proxy_line(&name, entry));
                names.push(name);
            }
        }
    }

    names
}

fn proxy_line(name: &str, entry: &ProxyEntry) -> String {
    let mut line = format!(
        "{} = {}, {}, {}",
        name, entry.protocol, entry.host, entry.port
    );
    if let Some(auth) = &entry.auth {
        line.push_str(&format!(
            ", username={}, password={}",
            auth.username, auth.password
        ));
    }
    line
}
