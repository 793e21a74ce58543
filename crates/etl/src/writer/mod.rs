//! Writer: persists classified records as partitioned TSV files.
//!
//! - `ops.rs`: filesystem seam ([`FileOps`])
//! - `live.rs` / `fake.rs`: real and in-memory implementations
//! - `registry.rs`: open-handle cache with expiry sweep
//! - `schema.rs`: per-kind columns and partitions
//! - `partitioned.rs`: line formatting and path building

pub mod fake;
pub mod live;
pub mod ops;
pub mod partitioned;
pub mod registry;
pub mod schema;

pub use live::LiveFs;
pub use ops::FileOps;
pub use partitioned::{PartitionedWriter, SaveOutcome};
pub use registry::{HandleRegistry, SweepMode};
pub use schema::{ColumnSchema, KindLayout};
