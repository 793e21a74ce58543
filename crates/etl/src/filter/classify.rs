//! Classifier: ordered, first-match-wins rules assigning a [`Kind`].
//!
//! Every rule first requires the `type` value to be in `[0-9a-zA-Z_.]*`
//! and the host to pass the whitelist. Then, in order:
//!
//! 1. Access: path is the access pixel and type is an access type
//! 2. Click:  path is the access pixel and type is anything else
//! 3. Open:   path is the open pixel
//! 4. Others: path has no `.`, or ends in `.htm`/`.html`, and type is
//!    not the rejected sentinel
//!
//! Access must be tried before Click: both share the pixel and differ
//! only by type.

use serde::{Deserialize, Serialize};

use super::blacklist::IpBlacklist;
use super::whitelist::HostWhitelist;
use crate::record::{Kind, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub access_path: String,
    pub open_path: String,
    pub access_types: Vec<String>,
    pub rejected_type: String,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            access_path: "/img/gut.gif".to_string(),
            open_path: "/img/open-gut.gif".to_string(),
            access_types: vec!["access".to_string(), "faccess".to_string()],
            rejected_type: "bad_type".to_string(),
        }
    }
}

/// Outcome of [`Classifier::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Blacklisted,
    Dropped,
    Accept(Kind),
}

pub struct Classifier {
    rules: ClassifierRules,
    whitelist: HostWhitelist,
    blacklist: IpBlacklist,
}

impl Classifier {
    pub fn new(rules: ClassifierRules, whitelist: HostWhitelist, blacklist: IpBlacklist) -> Self {
        Self { rules, whitelist, blacklist }
    }

    /// Blacklist check, then the rule chain.
    pub fn classify(&self, record: &Record) -> Verdict {
        if self.blacklist.blocks(record) {
            return Verdict::Blacklisted;
        }
        match self.kind_of(record.event_type(), record.url_path(), record.host()) {
            Some(kind) => Verdict::Accept(kind),
            None => Verdict::Dropped,
        }
    }

    pub fn kind_of(&self, event_type: &str, path: &str, host: &str) -> Option<Kind> {
        if !valid_type_charset(event_type) || !self.whitelist.allows(host) {
            return None;
        }

        let is_access_type = self.rules.access_types.iter().any(|t| t == event_type);
        if path == self.rules.access_path {
            return Some(if is_access_type { Kind::Access } else { Kind::Click });
        }
        if path == self.rules.open_path {
            return Some(Kind::Open);
        }
        if is_page_path(path) && event_type != self.rules.rejected_type {
            return Some(Kind::Others);
        }
        None
    }
}

fn valid_type_charset(t: &str) -> bool {
    t.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}

fn is_page_path(path: &str) -> bool {
    !path.contains('.') || path.ends_with(".html") || path.ends_with(".htm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::keys;

    fn classifier() -> Classifier {
        Classifier::new(
            ClassifierRules::default(),
            HostWhitelist::from_patterns([r"^www\.example\.com$"]).unwrap(),
            IpBlacklist::new(),
        )
    }

    const HOST: &str = "www.example.com";

    // ── Rule precedence ──────────────────────────────────────────

    #[test]
    fn test_access_before_click() {
        let c = classifier();
        assert_eq!(c.kind_of("access", "/img/gut.gif", HOST), Some(Kind::Access));
        assert_eq!(c.kind_of("faccess", "/img/gut.gif", HOST), Some(Kind::Access));
    }

    #[test]
    fn test_other_types_on_pixel_are_clicks() {
        let c = classifier();
        assert_eq!(c.kind_of("bad_type", "/img/gut.gif", HOST), Some(Kind::Click));
        assert_eq!(c.kind_of("", "/img/gut.gif", HOST), Some(Kind::Click));
        assert_eq!(c.kind_of("nav.top", "/img/gut.gif", HOST), Some(Kind::Click));
    }

    #[test]
    fn test_open_pixel_ignores_type_value() {
        let c = classifier();
        assert_eq!(c.kind_of("access", "/img/open-gut.gif", HOST), Some(Kind::Open));
        assert_eq!(c.kind_of("bad_type", "/img/open-gut.gif", HOST), Some(Kind::Open));
    }

    #[test]
    fn test_others_page_paths() {
        let c = classifier();
        assert_eq!(c.kind_of("", "/", HOST), Some(Kind::Others));
        assert_eq!(c.kind_of("", "/news/index.html", HOST), Some(Kind::Others));
        assert_eq!(c.kind_of("x", "/old/page.htm", HOST), Some(Kind::Others));
        assert_eq!(c.kind_of("bad_type", "/", HOST), None);
        assert_eq!(c.kind_of("", "/static/app.js", HOST), None);
        assert_eq!(c.kind_of("", "/v1.2/list", HOST), None);
    }

    // ── Shared preconditions ─────────────────────────────────────

    #[test]
    fn test_type_charset_required() {
        let c = classifier();
        assert_eq!(c.kind_of("click,x", "/img/gut.gif", HOST), None);
        assert_eq!(c.kind_of("a b", "/", HOST), None);
        assert_eq!(c.kind_of("<script>", "/img/open-gut.gif", HOST), None);
    }

    #[test]
    fn test_host_must_be_whitelisted() {
        let c = classifier();
        assert_eq!(c.kind_of("access", "/img/gut.gif", "evil.com"), None);

        let empty = Classifier::new(ClassifierRules::default(), HostWhitelist::new(), IpBlacklist::new());
        assert_eq!(empty.kind_of("access", "/img/gut.gif", HOST), None);
    }

    // ── Record verdicts ──────────────────────────────────────────

    fn record(event_type: &str, path: &str, ip: &str) -> Record {
        let mut r = Record::new();
        r.insert(keys::PARAM_TYPE, event_type);
        r.insert(keys::URL_PATH, path);
        r.insert(keys::HOST, HOST);
        r.insert(keys::IP, ip);
        r
    }

    #[test]
    fn test_verdicts() {
        let mut blacklist = IpBlacklist::new();
        blacklist.insert_str("6.6.6.6").unwrap();
        let c = Classifier::new(
            ClassifierRules::default(),
            HostWhitelist::from_patterns([HOST]).unwrap(),
            blacklist,
        );

        assert_eq!(c.classify(&record("access", "/img/gut.gif", "1.1.1.1")), Verdict::Accept(Kind::Access));
        assert_eq!(c.classify(&record("access", "/img/gut.gif", "6.6.6.6")), Verdict::Blacklisted);
        assert_eq!(c.classify(&record("", "/a.png", "1.1.1.1")), Verdict::Dropped);
    }
}
