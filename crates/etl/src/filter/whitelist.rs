use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};

use crate::error::EtlError;

/// Ordered set of host patterns; a host is legitimate when any pattern
/// matches (unanchored). An empty whitelist rejects every host.
#[derive(Default)]
pub struct HostWhitelist {
    matchers: Vec<RegexMatcher>,
}

impl HostWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every pattern, failing on the first invalid one.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, EtlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for pattern in patterns {
            list.push(pattern.as_ref())?;
        }
        Ok(list)
    }

    pub fn push(&mut self, pattern: &str) -> Result<(), EtlError> {
        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(false)
            .multi_line(false)
            .build(pattern)
            .map_err(|e| EtlError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        self.matchers.push(matcher);
        Ok(())
    }

    #[inline]
    pub fn allows(&self, host: &str) -> bool {
        self.matchers
            .iter()
            .any(|m| m.is_match(host.as_bytes()).unwrap_or(false))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_whitelist_rejects_all() {
        let list = HostWhitelist::new();
        assert!(!list.allows("www.example.com"));
        assert!(!list.allows(""));
    }

    #[test]
    fn test_any_pattern_matches() {
        let list = HostWhitelist::from_patterns([r"^www\.example\.com$", r"\.example\.org$"]).unwrap();
        assert!(list.allows("www.example.com"));
        assert!(list.allows("m.example.org"));
        assert!(!list.allows("example.net"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_patterns_are_unanchored_and_case_sensitive() {
        let list = HostWhitelist::from_patterns(["example"]).unwrap();
        assert!(list.allows("www.example.com"));
        assert!(!list.allows("WWW.EXAMPLE.COM"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = HostWhitelist::from_patterns(["[unclosed"]).err().unwrap();
        assert!(matches!(err, EtlError::InvalidPattern { .. }));
    }
}
