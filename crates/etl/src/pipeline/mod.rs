//! Pipeline: concurrent fan-out/fan-in from raw lines to disk.
//!
//! - `run.rs`: [`Pipeline`] lifecycle, submission and shutdown
//! - `workers.rs`: extractor and classify/write loops, stage supervisor
//! - `background.rs`: periodic soft sweep of the handle registry
//! - `metrics.rs`: atomic counters and their snapshot
//! - `context.rs`: shared read-only stages

pub mod background;
pub mod context;
pub mod metrics;
pub mod run;
mod workers;

pub use context::EtlContext;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use run::{Pipeline, PipelineSettings, StopHandle};
