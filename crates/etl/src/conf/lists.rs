//! Loaders for the line-oriented lists and the JSON column schema.
//!
//! A missing or unreadable file degrades to the empty structure and is
//! logged; loading never aborts startup.

use std::path::Path;

use tracing::{error, info, warn};

use crate::filter::{HostWhitelist, IpBlacklist};
use crate::writer::ColumnSchema;

fn read_list(path: &str, what: &str) -> Option<String> {
    if path.is_empty() {
        info!(list = what, "not configured");
        return None;
    }
    match std::fs::read_to_string(Path::new(path)) {
        Ok(text) => Some(text),
        Err(e) => {
            error!(list = what, path, error = %e, "failed to read, using empty");
            None
        }
    }
}

/// One regex per line.
pub fn load_whitelist(path: &str) -> HostWhitelist {
    let whitelist = read_list(path, "host whitelist").map(|t| parse_whitelist(&t)).unwrap_or_default();
    if whitelist.is_empty() {
        warn!("host whitelist is empty, every host will be rejected");
    }
    whitelist
}

pub fn parse_whitelist(text: &str) -> HostWhitelist {
    let mut whitelist = HostWhitelist::new();
    for (n, pattern) in text.lines().enumerate() {
        if pattern.trim().is_empty() {
            warn!(line = n + 1, "skipping blank whitelist pattern");
            continue;
        }
        if let Err(e) = whitelist.push(pattern) {
            error!(line = n + 1, error = %e, "skipping whitelist pattern");
        }
    }
    whitelist
}

/// One dotted IPv4 address per line; `#` starts a comment line.
pub fn load_blacklist(path: &str) -> IpBlacklist {
    let blacklist = read_list(path, "ip blacklist").map(|t| parse_blacklist(&t)).unwrap_or_default();
    info!(entries = blacklist.len(), "ip blacklist loaded");
    blacklist
}

pub fn parse_blacklist(text: &str) -> IpBlacklist {
    let mut blacklist = IpBlacklist::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(e) = blacklist.insert_str(line) {
            error!(line = n + 1, error = %e, "skipping blacklist entry");
        }
    }
    blacklist
}

/// One user-agent substring per line.
pub fn load_spiders(path: &str) -> Vec<String> {
    let spiders = read_list(path, "spider list").map(|t| parse_spiders(&t)).unwrap_or_default();
    info!(entries = spiders.len(), "spider list loaded");
    spiders
}

/// Blank lines are skipped; an empty signature would match every agent.
pub fn parse_spiders(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_schema(path: &str) -> ColumnSchema {
    let Some(text) = read_list(path, "column schema") else {
        warn!("no column schema, nothing will be written");
        return ColumnSchema::new();
    };
    match ColumnSchema::from_json(&text) {
        Ok(schema) => {
            info!(kinds = schema.len(), "column schema loaded");
            schema
        }
        Err(e) => {
            error!(path, error = %e, "column schema is malformed, nothing will be written");
            ColumnSchema::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Kind;

    #[test]
    fn test_parse_whitelist_skips_blank_and_bad_patterns() {
        let wl = parse_whitelist("^www\\.example\\.com$\n\n(unclosed\n\\.example\\.org$\n");
        assert_eq!(wl.len(), 2);
        assert!(wl.allows("www.example.com"));
        assert!(wl.allows("news.example.org"));
        assert!(!wl.allows("example.net"));
    }

    #[test]
    fn test_parse_blacklist() {
        let bl = parse_blacklist("# office\n10.0.0.1\n  192.168.1.2  \n\nnot-an-ip\n");
        assert_eq!(bl.len(), 2);
        assert!(bl.contains(0x0A00_0001));
        assert!(bl.contains(0xC0A8_0102));
    }

    #[test]
    fn test_parse_spiders() {
        assert_eq!(parse_spiders("Googlebot\n\n  Baiduspider \n"), vec!["Googlebot", "Baiduspider"]);
    }

    #[test]
    fn test_missing_files_degrade_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let missing = missing.to_str().unwrap();

        assert!(load_whitelist(missing).is_empty());
        assert!(load_blacklist(missing).is_empty());
        assert!(load_spiders(missing).is_empty());
        assert!(load_schema(missing).is_empty());
        assert!(load_schema("").is_empty());
    }

    #[test]
    fn test_load_schema_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("columns.json");
        std::fs::write(&path, r#"{"open": {"columns": ["event_ip"], "partitions": ["event_day"]}}"#).unwrap();

        let schema = load_schema(path.to_str().unwrap());
        assert_eq!(schema.len(), 1);
        assert!(schema.layout(Kind::Open).is_some());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_schema(path.to_str().unwrap()).is_empty());
    }
}
