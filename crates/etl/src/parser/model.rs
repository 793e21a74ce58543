use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Too few fields: {found} (min: {required})")]
    TooFewFields { found: usize, required: usize },

    #[error("Invalid timestamp: {0}")]
    InvalidTime(String),

    #[error("Invalid escape sequence in {0:?}")]
    InvalidEscape(String),
}
