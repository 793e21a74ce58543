//! Handle registry: the cache of open output files keyed by path.
//!
//! One reader/writer lock guards the map. Lookups and writes take the
//! read lock; each handle carries its own mutex so writers to different
//! files do not serialize. A miss escalates to the write lock, creates
//! the directory, opens the file and inserts it.
//!
//! Handles leave the registry only through [`HandleRegistry::sweep`]:
//! [`SweepMode::Expired`] closes handles whose path has no `/YYYYMMDD/`
//! segment or whose date is older than the retention window;
//! [`SweepMode::All`] closes everything.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use grep_matcher::Matcher;
use grep_regex::RegexMatcher;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::ops::{FileOps, Handle};
use crate::error::EtlError;

const DATE_SEGMENT: &str = r"/\d{8}/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Close handles with a missing or stale date segment.
    Expired,
    /// Close every handle.
    All,
}

pub struct HandleRegistry {
    ops: Box<dyn FileOps>,
    handles: RwLock<HashMap<PathBuf, Mutex<Handle>>>,
    date_segment: RegexMatcher,
    retention: chrono::Duration,
}

impl HandleRegistry {
    pub fn new(ops: Box<dyn FileOps>, retention_days: u32) -> Result<Self, EtlError> {
        let date_segment = RegexMatcher::new(DATE_SEGMENT).map_err(|e| EtlError::InvalidPattern {
            pattern: DATE_SEGMENT.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            ops,
            handles: RwLock::new(HashMap::new()),
            date_segment,
            retention: chrono::Duration::days(i64::from(retention_days)),
        })
    }

    /// Append `line` to the file at `path`, opening it on first use.
    pub fn append(&self, path: &Path, line: &[u8]) -> Result<(), EtlError> {
        {
            let handles = self.handles.read();
            if let Some(handle) = handles.get(path) {
                return write_line(handle, path, line);
            }
        }

        let mut handles = self.handles.write();
        if !handles.contains_key(path) {
            let handle = self.open(path)?;
            handles.insert(path.to_path_buf(), Mutex::new(handle));
            debug!(path = %path.display(), open = handles.len(), "opened output file");
        }
        let handles = RwLockWriteGuard::downgrade(handles);
        match handles.get(path) {
            Some(handle) => write_line(handle, path, line),
            None => Ok(()),
        }
    }

    fn open(&self, path: &Path) -> Result<Handle, EtlError> {
        if let Some(dir) = path.parent() {
            self.ops
                .create_dir_all(dir)
                .map_err(|e| EtlError::io(dir, e))?;
        }
        self.ops.open_append(path).map_err(|e| EtlError::io(path, e))
    }

    /// Close and evict handles per `mode`, judged against `now`.
    /// Returns the number evicted.
    pub fn sweep(&self, mode: SweepMode, now: DateTime<Utc>) -> usize {
        let doomed: Vec<PathBuf> = {
            let handles = self.handles.read();
            handles
                .keys()
                .filter(|path| mode == SweepMode::All || self.is_expired(path, now))
                .cloned()
                .collect()
        };

        let mut evicted = 0;
        for path in doomed {
            let removed = self.handles.write().remove(&path);
            if let Some(handle) = removed {
                if let Err(e) = handle.into_inner().flush() {
                    warn!(path = %path.display(), error = %e, "flush on close failed");
                }
                debug!(path = %path.display(), "closed output file");
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(?mode, evicted, remaining = self.len(), "swept output handles");
        }
        evicted
    }

    fn is_expired(&self, path: &Path, now: DateTime<Utc>) -> bool {
        let text = path.to_string_lossy();
        let found = self.date_segment.find(text.as_bytes()).ok().flatten();
        let Some(m) = found else {
            warn!(path = %text, "output path has no date segment");
            return true;
        };
        let token = &text[m.start() + 1..m.end() - 1];
        match NaiveDate::parse_from_str(token, "%Y%m%d") {
            Ok(date) => {
                let midnight = date.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
                match midnight {
                    Some(midnight) => now.signed_duration_since(midnight) > self.retention,
                    None => true,
                }
            }
            Err(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.handles.read().contains_key(path)
    }
}

fn write_line(handle: &Mutex<Handle>, path: &Path, line: &[u8]) -> Result<(), EtlError> {
    handle
        .lock()
        .write_all(line)
        .map_err(|e| EtlError::io(path, e))
}
