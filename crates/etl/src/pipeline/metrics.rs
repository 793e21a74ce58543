use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::record::Kind;

/// Keeps each counter group on its own cache line so extractor and
/// writer workers do not contend on the same line.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Updated by extractor workers, once per input line.
#[derive(Debug, Default)]
pub struct IntakeMetrics {
    pub received: AtomicU64,
    pub rejected: AtomicU64,
    pub extracted: AtomicU64,
}

/// Updated by classify/write workers, once per record.
#[derive(Debug, Default)]
pub struct OutputMetrics {
    pub blacklisted: AtomicU64,
    pub blank: AtomicU64,
    pub write_errors: AtomicU64,
    pub access: AtomicU64,
    pub click: AtomicU64,
    pub open: AtomicU64,
    pub others: AtomicU64,
}

#[derive(Debug, Default)]
pub struct SweepMetrics {
    pub runs: AtomicU64,
    pub evicted: AtomicU64,
}

/// Pipeline counters. All operations are `Relaxed`; a snapshot may tear
/// across groups while workers are still running.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub intake: CacheAligned<IntakeMetrics>,
    pub output: CacheAligned<OutputMetrics>,
    pub sweep: CacheAligned<SweepMetrics>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_received(&self) {
        self.intake.0.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Line discarded by the tokenizer.
    #[inline]
    pub fn record_rejected(&self) {
        self.intake.0.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_extracted(&self) {
        self.intake.0.extracted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_blacklisted(&self) {
        self.output.0.blacklisted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_blank(&self) {
        self.output.0.blank.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_error(&self) {
        self.output.0.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_written(&self, kind: Kind) {
        let counter = match kind {
            Kind::Access => &self.output.0.access,
            Kind::Click => &self.output.0.click,
            Kind::Open => &self.output.0.open,
            Kind::Others => &self.output.0.others,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self, evicted: usize) {
        self.sweep.0.runs.fetch_add(1, Ordering::Relaxed);
        self.sweep.0.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let intake = &self.intake.0;
        let output = &self.output.0;
        let access = output.access.load(Ordering::Relaxed);
        let click = output.click.load(Ordering::Relaxed);
        let open = output.open.load(Ordering::Relaxed);
        let others = output.others.load(Ordering::Relaxed);

        MetricsSnapshot {
            lines_received: intake.received.load(Ordering::Relaxed),
            lines_rejected: intake.rejected.load(Ordering::Relaxed),
            records_extracted: intake.extracted.load(Ordering::Relaxed),
            records_blacklisted: output.blacklisted.load(Ordering::Relaxed),
            blank_lines: output.blank.load(Ordering::Relaxed),
            write_errors: output.write_errors.load(Ordering::Relaxed),
            written_access: access,
            written_click: click,
            written_open: open,
            written_others: others,
            written_total: access + click + open + others,
            sweeps: self.sweep.0.runs.load(Ordering::Relaxed),
            handles_evicted: self.sweep.0.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Read-only copy of [`PipelineMetrics`], logged at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub lines_received: u64,
    pub lines_rejected: u64,
    pub records_extracted: u64,
    pub records_blacklisted: u64,
    pub blank_lines: u64,
    pub write_errors: u64,
    pub written_access: u64,
    pub written_click: u64,
    pub written_open: u64,
    pub written_others: u64,
    pub written_total: u64,
    pub sweeps: u64,
    pub handles_evicted: u64,
}

impl MetricsSnapshot {
    pub fn written(&self, kind: Kind) -> u64 {
        match kind {
            Kind::Access => self.written_access,
            Kind::Click => self.written_click,
            Kind::Open => self.written_open,
            Kind::Others => self.written_others,
        }
    }
}
