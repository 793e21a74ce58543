//! Pipeline: bounded input queue → extractor pool → bounded output queue
//! → classify/write pool, plus the periodic sweep and the shutdown barrier.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;
use tracing::info;

use super::background::periodic_sweep;
use super::context::EtlContext;
use super::metrics::{MetricsSnapshot, PipelineMetrics};
use super::workers::{extract_worker, save_worker, supervise, Teardown};
use crate::error::EtlError;
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub input_queue_size: usize,
    pub output_queue_size: usize,
    pub parse_workers: usize,
    pub save_workers: usize,
    pub sweep_interval: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_queue_size: 100,
            output_queue_size: 200,
            parse_workers: 8,
            save_workers: 5,
            sweep_interval: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Asks readers to stop pushing. In-flight lines still drain.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

pub struct Pipeline {
    input: mpsc::Sender<String>,
    stop: StopHandle,
    metrics: Arc<PipelineMetrics>,
    done: oneshot::Receiver<MetricsSnapshot>,
}

impl Pipeline {
    /// Spawn both worker pools, the periodic sweep and the supervisor.
    /// Must be called from within a tokio runtime.
    pub fn start(context: Arc<EtlContext>, settings: &PipelineSettings) -> Self {
        let metrics = Arc::new(PipelineMetrics::new());
        let (input_tx, input_rx) = mpsc::channel::<String>(settings.input_queue_size.max(1));
        let (output_tx, output_rx) = mpsc::channel::<Record>(settings.output_queue_size.max(1));
        let input_rx = Arc::new(Mutex::new(input_rx));
        let output_rx = Arc::new(Mutex::new(output_rx));

        info!(
            parse_workers = settings.parse_workers,
            save_workers = settings.save_workers,
            input_queue = settings.input_queue_size,
            output_queue = settings.output_queue_size,
            "starting pipeline"
        );

        let extractors = (0..settings.parse_workers.max(1))
            .map(|id| {
                tokio::spawn(extract_worker(
                    id,
                    Arc::clone(&input_rx),
                    output_tx.clone(),
                    Arc::clone(&context),
                    Arc::clone(&metrics),
                ))
            })
            .collect();
        // The output queue closes once every extractor has dropped its clone.
        drop(output_tx);

        let savers = (0..settings.save_workers.max(1))
            .map(|shard| {
                tokio::spawn(save_worker(
                    shard,
                    Arc::clone(&output_rx),
                    Arc::clone(&context),
                    Arc::clone(&metrics),
                ))
            })
            .collect();

        let (sweep_stop, sweep_rx) = watch::channel(false);
        let sweeper = tokio::spawn(periodic_sweep(
            Arc::clone(&context.writer),
            Arc::clone(&metrics),
            settings.sweep_interval,
            sweep_rx,
        ));

        let (done_tx, done_rx) = oneshot::channel();
        let teardown = Teardown { extractors, savers, sweeper, sweep_stop, done: done_tx };
        tokio::spawn(supervise(teardown, context, Arc::clone(&metrics)));

        Self { input: input_tx, stop: StopHandle::new(), metrics, done: done_rx }
    }

    /// Queue one raw line. Waits while the input queue is full.
    pub async fn submit_line(&self, line: impl Into<String>) -> Result<(), EtlError> {
        self.input.send(line.into()).await.map_err(|_| EtlError::PipelineClosed)
    }

    /// Queue every line of `reader` until EOF or a stop request. Returns
    /// the number of lines queued. Invalid UTF-8 is replaced, not rejected.
    pub async fn submit_reader<R>(&self, reader: R) -> Result<u64, EtlError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.pump(reader, Path::new("-")).await
    }

    pub async fn submit_file(&self, path: impl AsRef<Path>) -> Result<u64, EtlError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| EtlError::io(path, e))?;
        let count = self.pump(BufReader::new(file), path).await?;
        info!(path = %path.display(), lines = count, "input file queued");
        Ok(count)
    }

    async fn pump<R>(&self, reader: R, source: &Path) -> Result<u64, EtlError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = SplitStream::new(reader.split(b'\n'));
        let mut stop = self.stop.subscribe();
        let mut count = 0u64;

        loop {
            if *stop.borrow_and_update() {
                info!(source = %source.display(), lines = count, "stop requested, input abandoned");
                break;
            }
            let next = tokio::select! {
                biased;
                _ = stop.changed() => continue,
                next = lines.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| EtlError::io(source, e))?;
            self.submit_line(decode_line(chunk)).await?;
            count += 1;
        }
        Ok(count)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Live counters; may tear while workers run.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Close the input queue and wait for the full drain: both stages
    /// joined and every handle closed.
    pub async fn finish(self) -> Result<MetricsSnapshot, EtlError> {
        let Pipeline { input, done, .. } = self;
        drop(input);
        done.await.map_err(|_| EtlError::PipelineClosed)
    }
}

fn decode_line(mut chunk: Vec<u8>) -> String {
    if chunk.last() == Some(&b'\r') {
        chunk.pop();
    }
    match String::from_utf8(chunk) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
