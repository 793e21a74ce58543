use std::collections::BTreeMap;

/// Cookie jar parsed from the run of `key=value;` tokens in a log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    fields: BTreeMap<String, String>,
}

impl CookieJar {
    /// A single `-` token means "no cookies". Each token has `;` trimmed and
    /// is split on its first `=`; tokens without `=` or with an empty key
    /// are ignored.
    pub fn parse(tokens: &[&str]) -> Self {
        let mut fields = BTreeMap::new();
        if tokens == ["-"] {
            return Self { fields };
        }
        for token in tokens {
            let token = token.trim_matches(';');
            if let Some((key, value)) = token.split_once('=') {
                if !key.is_empty() {
                    fields.insert(key.to_string(), value.to_string());
                }
            }
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compact JSON object with keys in sorted order.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }

    /// First 32 bytes of a cookie value, or `""` when shorter.
    pub fn prefix32(&self, name: &str) -> &str {
        self.get(name).and_then(|v| v.get(..32)).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_means_no_cookies() {
        assert!(CookieJar::parse(&["-"]).is_empty());
    }

    #[test]
    fn test_tokens_split_on_first_equals() {
        let jar = CookieJar::parse(&["A=1;", "B=x=y;", "C=3"]);
        assert_eq!(jar.get("A"), Some("1"));
        assert_eq!(jar.get("B"), Some("x=y"));
        assert_eq!(jar.get("C"), Some("3"));
    }

    #[test]
    fn test_invalid_tokens_ignored() {
        let jar = CookieJar::parse(&["novalue;", "=orphan;", "-", "K=v"]);
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("K"), Some("v"));
    }

    #[test]
    fn test_json_is_sorted_and_compact() {
        let jar = CookieJar::parse(&["b=2;", "a=1;"]);
        assert_eq!(jar.to_json(), r#"{"a":"1","b":"2"}"#);
        assert_eq!(CookieJar::default().to_json(), "{}");
    }

    #[test]
    fn test_prefix32() {
        let long = format!("V={}:FG=1", "A".repeat(32));
        let jar = CookieJar::parse(&[long.as_str(), "S=short"]);
        assert_eq!(jar.prefix32("V"), "A".repeat(32));
        assert_eq!(jar.prefix32("S"), "");
        assert_eq!(jar.prefix32("missing"), "");
    }
}
