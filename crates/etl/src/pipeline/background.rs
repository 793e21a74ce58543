use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::metrics::PipelineMetrics;
use crate::writer::PartitionedWriter;

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Soft-sweep the writer's handle registry every `period` until `shutdown`
/// flips to `true` (or its sender is dropped). The first sweep happens one
/// full period after start. Periods under one second are raised to one
/// second.
pub async fn periodic_sweep(
    writer: Arc<PartitionedWriter>,
    metrics: Arc<PipelineMetrics>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if period < MIN_PERIOD {
        warn!(?period, "sweep period too short, using 1s");
    }
    let period = period.max(MIN_PERIOD);
    info!(period_secs = period.as_secs(), "starting periodic handle sweep");

    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let evicted = writer.close_expired();
                metrics.record_sweep(evicted);
                debug!(evicted, open = writer.registry().len(), "periodic sweep finished");
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("periodic handle sweep stopped");
}
