//! Access-log parsing: tokenizer, request-line and cookie sub-parsers,
//! and the [`Extractor`] that assembles an enriched record.

pub mod cookie;
pub mod extract;
pub mod model;
pub mod request;
pub mod tokenizer;

pub use extract::{Extractor, IdentityCookies};
pub use model::ParseError;
pub use tokenizer::TokenizerLayout;
