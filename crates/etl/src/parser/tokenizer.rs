//! Field tokenizer for space-delimited access-log lines.
//!
//! A space ends a field unless the scanner is inside a `[...]` or `"..."`
//! run; a run only opens when `[` or `"` is the first character of a field.
//! Surrounding `[`, `]` and `"` are trimmed from each emitted token.

use serde::{Deserialize, Serialize};

/// Deployment-specific token layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerLayout {
    /// Raw field indices consumed by the scan but not emitted, ascending.
    pub drop_positions: Vec<usize>,
    /// Lines yielding fewer tokens than this are discarded.
    pub min_fields: usize,
}

impl Default for TokenizerLayout {
    fn default() -> Self {
        Self {
            drop_positions: vec![2, 3, 8],
            min_fields: 11,
        }
    }
}

impl TokenizerLayout {
    pub fn new(mut drop_positions: Vec<usize>, min_fields: usize) -> Self {
        drop_positions.sort_unstable();
        drop_positions.dedup();
        Self { drop_positions, min_fields }
    }

    fn is_dropped(&self, index: usize) -> bool {
        self.drop_positions.binary_search(&index).is_ok()
    }

    /// Split `line` into tokens, skipping the configured drop positions.
    pub fn tokenize<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let bytes = line.as_bytes();
        let mut tokens = Vec::with_capacity(16);
        let mut index = 0usize;
        let mut start = 0usize;
        let mut field_start = true;
        let mut closer: Option<u8> = None;

        for (i, &c) in bytes.iter().enumerate() {
            if field_start {
                closer = match c {
                    b'[' => Some(b']'),
                    b'"' => Some(b'"'),
                    _ => closer,
                };
            }

            if c != b' ' || closer.is_some() {
                if i != start && closer == Some(c) {
                    closer = None;
                }
                field_start = false;
                continue;
            }

            if !self.is_dropped(index) {
                tokens.push(trim_token(&line[start..i]));
            }
            index += 1;
            start = i + 1;
            field_start = true;
        }

        if start < bytes.len() && !self.is_dropped(index) {
            tokens.push(trim_token(&line[start..]));
        }
        tokens
    }
}

fn trim_token(raw: &str) -> &str {
    raw.trim_matches(|c| c == '[' || c == ']' || c == '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_drops() -> TokenizerLayout {
        TokenizerLayout::new(vec![], 0)
    }

    #[test]
    fn test_plain_fields_split_on_space() {
        assert_eq!(no_drops().tokenize("a b c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_bracket_run_keeps_spaces() {
        let tokens = no_drops().tokenize("h [18/Oct/2026:10:00:00 +0800] x");
        assert_eq!(tokens, vec!["h", "18/Oct/2026:10:00:00 +0800", "x"]);
    }

    #[test]
    fn test_quote_run_keeps_spaces() {
        let tokens = no_drops().tokenize(r#""GET /p?a=1 HTTP/1.1" 200"#);
        assert_eq!(tokens, vec!["GET /p?a=1 HTTP/1.1", "200"]);
    }

    #[test]
    fn test_run_only_opens_at_field_start() {
        let tokens = no_drops().tokenize(r#"a"b c"#);
        assert_eq!(tokens, vec!["a\"b", "c"]);
    }

    #[test]
    fn test_consecutive_spaces_yield_empty_tokens() {
        assert_eq!(no_drops().tokenize("a  b"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_trailing_space_adds_nothing() {
        assert_eq!(no_drops().tokenize("a b "), vec!["a", "b"]);
    }

    #[test]
    fn test_single_char_last_token_kept() {
        assert_eq!(no_drops().tokenize("a b -"), vec!["a", "b", "-"]);
    }

    #[test]
    fn test_drop_positions_skip_raw_indices() {
        let layout = TokenizerLayout::new(vec![1, 3], 0);
        assert_eq!(layout.tokenize("t0 t1 t2 t3 t4"), vec!["t0", "t2", "t4"]);
    }

    #[test]
    fn test_drop_positions_are_normalized() {
        let layout = TokenizerLayout::new(vec![8, 2, 3, 3], 11);
        assert_eq!(layout.drop_positions, vec![2, 3, 8]);
    }

    #[test]
    fn test_default_layout() {
        let layout = TokenizerLayout::default();
        assert_eq!(layout.drop_positions, vec![2, 3, 8]);
        assert_eq!(layout.min_fields, 11);
    }
}
