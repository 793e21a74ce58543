//! Conf module: configuration model, loading, and list/schema files.

pub mod lists;
pub mod load;
pub mod model;

pub use model::EtlConfig;
