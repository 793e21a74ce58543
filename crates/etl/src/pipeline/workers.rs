//! Worker loops for both pipeline stages and the shutdown supervisor.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::context::EtlContext;
use super::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::filter::Verdict;
use crate::record::Record;
use crate::writer::SaveOutcome;

pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Drain raw lines until the input queue is closed and empty.
pub(crate) async fn extract_worker(
    id: usize,
    input: SharedReceiver<String>,
    output: mpsc::Sender<Record>,
    context: Arc<EtlContext>,
    metrics: Arc<PipelineMetrics>,
) {
    debug!(worker = id, "extractor started");
    loop {
        let next = input.lock().await.recv().await;
        let Some(line) = next else { break };
        metrics.record_received();

        match context.extractor.extract(&line) {
            Ok(record) => {
                metrics.record_extracted();
                if output.send(record).await.is_err() {
                    error!(worker = id, "output queue closed early");
                    break;
                }
            }
            Err(e) => {
                metrics.record_rejected();
                debug!(worker = id, error = %e, "line rejected");
            }
        }
    }
    debug!(worker = id, "extractor exited");
}

/// Classify and persist records until the output queue is closed and
/// empty. `shard` doubles as the output file suffix.
pub(crate) async fn save_worker(
    shard: usize,
    input: SharedReceiver<Record>,
    context: Arc<EtlContext>,
    metrics: Arc<PipelineMetrics>,
) {
    debug!(worker = shard, "writer started");
    loop {
        let next = input.lock().await.recv().await;
        let Some(record) = next else { break };

        let kind = match context.classifier.classify(&record) {
            Verdict::Accept(kind) => kind,
            Verdict::Blacklisted => {
                metrics.record_blacklisted();
                continue;
            }
            Verdict::Dropped => continue,
        };

        match context.writer.save(&record, kind, shard) {
            Ok(SaveOutcome::Written) => metrics.record_written(kind),
            Ok(SaveOutcome::Blank) => metrics.record_blank(),
            Ok(SaveOutcome::UnknownKind) => {}
            Err(e) => {
                metrics.record_write_error();
                error!(worker = shard, %kind, error = %e, "write failed, record lost");
            }
        }
    }
    debug!(worker = shard, "writer exited");
}

pub(crate) struct Teardown {
    pub extractors: Vec<JoinHandle<()>>,
    pub savers: Vec<JoinHandle<()>>,
    pub sweeper: JoinHandle<()>,
    pub sweep_stop: watch::Sender<bool>,
    pub done: oneshot::Sender<MetricsSnapshot>,
}

/// Join each stage in order, stop the periodic sweep, close every
/// handle, then report.
pub(crate) async fn supervise(teardown: Teardown, context: Arc<EtlContext>, metrics: Arc<PipelineMetrics>) {
    let Teardown { extractors, savers, sweeper, sweep_stop, done } = teardown;

    join_stage("extractor", extractors).await;
    info!("all extractor workers exited, output queue closed");

    join_stage("writer", savers).await;
    info!("all writer workers exited");

    // Receiver may already be gone; either way the sweeper exits.
    let _ = sweep_stop.send(true);
    if let Err(e) = sweeper.await {
        error!(error = %e, "periodic sweep task failed");
    }

    let closed = context.writer.close_all();
    metrics.record_sweep(closed);

    let snapshot = metrics.snapshot();
    info!(
        received = snapshot.lines_received,
        rejected = snapshot.lines_rejected,
        written = snapshot.written_total,
        write_errors = snapshot.write_errors,
        "pipeline finished"
    );
    if done.send(snapshot).is_err() {
        debug!("pipeline completion receiver dropped");
    }
}

async fn join_stage(stage: &str, handles: Vec<JoinHandle<()>>) {
    for result in join_all(handles).await {
        if let Err(e) = result {
            error!(stage, error = %e, "worker task failed");
        }
    }
}
