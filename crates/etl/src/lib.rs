// Module layout for the access-log ETL crate.

// Data model and codecs
pub mod record;
pub mod decode;
pub mod error;

// Stages
pub mod parser;
pub mod filter;
pub mod writer;
pub mod pipeline;

// Process lifecycle
pub mod conf;
pub mod runtime;
