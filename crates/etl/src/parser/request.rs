//! Request-line and query-string parsing.

use percent_encoding::percent_decode_str;
use tracing::warn;

use super::model::ParseError;

/// `METHOD TARGET PROTOCOL` split out of the quoted request field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    /// Raw request target, query string included.
    pub target: String,
    pub protocol: String,
    /// Target before the first `?`.
    pub path: String,
    /// Decoded query pairs in first-seen order; repeated names are suffixed.
    pub params: Vec<(String, String)>,
}

impl RequestLine {
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(' ').collect();
        if parts.len() != 3 {
            warn!(request = raw, parts = parts.len(), "request line does not have 3 parts");
        }

        let method = parts.first().copied().unwrap_or_default().to_string();
        let target = parts.get(1).copied().unwrap_or_default().to_string();
        let protocol = parts.get(2).copied().unwrap_or_default().to_string();

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query)),
            None => (target.clone(), None),
        };
        let params = query.map(parse_query_pairs).unwrap_or_default();

        Self { method, target, protocol, path, params }
    }

    /// Query string exactly as sent, without the fragment.
    pub fn raw_query(&self) -> &str {
        raw_query_of(&self.target)
    }
}

/// The part of `url` after the first `?` and before any `#`.
pub fn raw_query_of(url: &str) -> &str {
    let Some((_, rest)) = url.split_once('?') else {
        return "";
    };
    rest.split_once('#').map(|(q, _)| q).unwrap_or(rest)
}

/// Split `a=1&b=2` into decoded pairs.
///
/// Pairs that do not split into exactly two parts on `=` are dropped.
/// A name seen again gets a numeric suffix: `a`, `a1`, `a2`, ...
/// Values that fail to unescape are kept raw.
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut seen: Vec<(String, usize)> = Vec::new();

    for kv in query.split('&') {
        let mut it = kv.split('=');
        let (Some(name), Some(raw), None) = (it.next(), it.next(), it.next()) else {
            continue;
        };
        let name = name.trim_matches(|c| c == '[' || c == ']');

        let key = match seen.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => {
                let key = format!("{}{}", name, count);
                *count += 1;
                key
            }
            None => {
                seen.push((name.to_string(), 1));
                name.to_string()
            }
        };

        let value = match query_unescape(raw) {
            Ok(decoded) => decoded.trim_matches(' ').to_string(),
            Err(e) => {
                warn!(value = raw, error = %e, "keeping raw query value");
                raw.to_string()
            }
        };

        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => pairs.push((key, value)),
        }
    }
    pairs
}

/// Form-style unescape: `+` is a space, `%XX` a byte. Malformed escapes and
/// non-UTF-8 results are errors.
pub fn query_unescape(raw: &str) -> Result<String, ParseError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ParseError::InvalidEscape(raw.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ParseError::InvalidEscape(raw.to_string()))
}

/// First value of `name` in a raw query string, form-decoded; `""` if absent.
pub fn query_value(query: &str, name: &str) -> String {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// Flatten pairs as a Hive map literal: pairs joined by `0x02`,
/// key and value joined by `0x03`.
pub fn hive_map(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}\u{3}{}", k, v))
        .collect::<Vec<_>>()
        .join("\u{2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    // ── Request line ─────────────────────────────────────────────

    #[test]
    fn test_request_line_three_parts() {
        let req = RequestLine::parse("GET /img/gut.gif?type=click&page=home HTTP/1.1");
        assert_eq!(req.method, "GET");
        assert_eq!(req.protocol, "HTTP/1.1");
        assert_eq!(req.path, "/img/gut.gif");
        assert_eq!(req.target, "/img/gut.gif?type=click&page=home");
        assert_eq!(lookup(&req.params, "type"), Some("click"));
        assert_eq!(lookup(&req.params, "page"), Some("home"));
    }

    #[test]
    fn test_request_line_missing_parts_default_empty() {
        let req = RequestLine::parse("GET");
        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "");
        assert_eq!(req.path, "");
        assert_eq!(req.protocol, "");
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_request_line_splits_on_first_question_mark() {
        let req = RequestLine::parse("GET /p?a=1?b HTTP/1.0");
        assert_eq!(req.path, "/p");
        assert_eq!(lookup(&req.params, "a"), Some("1?b"));
    }

    #[test]
    fn test_raw_query_strips_fragment() {
        assert_eq!(raw_query_of("/p?a=1&b=2#top"), "a=1&b=2");
        assert_eq!(raw_query_of("/p"), "");
        assert_eq!(raw_query_of("http://r.example.com/?tn=x"), "tn=x");
    }

    // ── Query pairs ──────────────────────────────────────────────

    #[test]
    fn test_repeated_names_get_suffixes() {
        let pairs = parse_query_pairs("a=1&a=2&a=3");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("a1".to_string(), "2".to_string()),
                ("a2".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_pairs_dropped() {
        let pairs = parse_query_pairs("a&b=1=2&c=3&=4");
        assert_eq!(lookup(&pairs, "a"), None);
        assert_eq!(lookup(&pairs, "b"), None);
        assert_eq!(lookup(&pairs, "c"), Some("3"));
        assert_eq!(lookup(&pairs, ""), Some("4"));
    }

    #[test]
    fn test_bracketed_names_trimmed() {
        let pairs = parse_query_pairs("ids[]=1&ids[]=2");
        assert_eq!(lookup(&pairs, "ids"), Some("1"));
        assert_eq!(lookup(&pairs, "ids1"), Some("2"));
    }

    #[test]
    fn test_values_decoded_and_trimmed() {
        let pairs = parse_query_pairs("q=%20hello+world%20&u=http%3A%2F%2Fa.com");
        assert_eq!(lookup(&pairs, "q"), Some("hello world"));
        assert_eq!(lookup(&pairs, "u"), Some("http://a.com"));
    }

    #[test]
    fn test_bad_escape_keeps_raw_value() {
        let pairs = parse_query_pairs("q=100%&r=%zz");
        assert_eq!(lookup(&pairs, "q"), Some("100%"));
        assert_eq!(lookup(&pairs, "r"), Some("%zz"));
    }

    // ── Helpers ──────────────────────────────────────────────────

    #[test]
    fn test_query_unescape() {
        assert_eq!(query_unescape("a+b%21").unwrap(), "a b!");
        assert!(query_unescape("%").is_err());
        assert!(query_unescape("%4").is_err());
        assert!(query_unescape("%ff").is_err());
    }

    #[test]
    fn test_query_value_takes_first() {
        assert_eq!(query_value("tn=a&tn=b", "tn"), "a");
        assert_eq!(query_value("x=1", "tn"), "");
        assert_eq!(query_value("tn=%2F", "tn"), "/");
    }

    #[test]
    fn test_hive_map_layout() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        assert_eq!(hive_map(&pairs), "a\u{3}1\u{2}b\u{3}2");
        assert_eq!(hive_map(&[]), "");
    }
}
