//! Run: feed input files (or stdin) through the pipeline until drained.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};

use super::stop::shutdown_signal;
use crate::conf::EtlConfig;
use crate::pipeline::{EtlContext, MetricsSnapshot, Pipeline};

/// Read `inputs` in order, or stdin when empty. A shutdown signal stops
/// reading; everything already queued is still written.
///
/// A stdin read parked in tokio's blocking pool outlives this call, so
/// the caller must not wait on the runtime's blocking threads at exit.
pub async fn run(
    context: Arc<EtlContext>,
    config: &EtlConfig,
    inputs: Vec<PathBuf>,
) -> anyhow::Result<MetricsSnapshot> {
    let stdin = BufReader::new(tokio::io::stdin());
    drive(context, config, inputs, stdin, shutdown_signal()).await
}

/// [`run`] with the fallback reader and the stop trigger supplied.
pub async fn drive<R, S>(
    context: Arc<EtlContext>,
    config: &EtlConfig,
    inputs: Vec<PathBuf>,
    fallback: R,
    shutdown: S,
) -> anyhow::Result<MetricsSnapshot>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()> + Send + 'static,
{
    let pipeline = Pipeline::start(context, &config.pipeline_settings());

    let stop = pipeline.stop_handle();
    let signal = tokio::spawn(async move {
        shutdown.await;
        stop.stop();
    });

    let queued = feed(&pipeline, &inputs, fallback).await;
    signal.abort();
    info!(lines = queued, "input exhausted, waiting for pipeline to drain");

    let snapshot = pipeline.finish().await?;
    Ok(snapshot)
}

async fn feed<R>(pipeline: &Pipeline, inputs: &[PathBuf], fallback: R) -> u64
where
    R: AsyncBufRead + Unpin,
{
    if inputs.is_empty() {
        info!("reading from stdin");
        return match pipeline.submit_reader(fallback).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                0
            }
        };
    }

    let stop = pipeline.stop_handle();
    let mut queued = 0;
    for path in inputs {
        if stop.is_stopped() {
            break;
        }
        match pipeline.submit_file(path).await {
            Ok(n) => queued += n,
            Err(e) => error!(path = %path.display(), error = %e, "skipping input file"),
        }
    }
    queued
}
