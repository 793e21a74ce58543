//! Fake: in-memory [`FileOps`] for deterministic tests.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::ops::{FileOps, Handle};

#[derive(Default)]
struct Inner {
    dirs: HashSet<PathBuf>,
    files: HashMap<PathBuf, Arc<Mutex<Vec<u8>>>>,
    opens: usize,
    fail_open: HashSet<PathBuf>,
}

/// Records directories and file contents in memory. Cloning shares state,
/// so a test can keep one clone while the registry owns another.
#[derive(Clone, Default)]
pub struct FakeFs {
    inner: Arc<Mutex<Inner>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `open_append(path)` fail.
    pub fn fail_open(&self, path: impl Into<PathBuf>) {
        self.inner.lock().fail_open.insert(path.into());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.lock();
        let buf = inner.files.get(path.as_ref())?;
        let text = String::from_utf8_lossy(&buf.lock()).into_owned();
        Some(text)
    }

    pub fn file_count(&self) -> usize {
        self.inner.lock().files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.inner.lock().dirs.len()
    }

    pub fn has_dir(&self, dir: impl AsRef<Path>) -> bool {
        self.inner.lock().dirs.contains(dir.as_ref())
    }

    /// Number of successful `open_append` calls.
    pub fn open_count(&self) -> usize {
        self.inner.lock().opens
    }
}

struct FakeHandle {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for FakeHandle {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileOps for FakeFs {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut inner = self.inner.lock();
        for ancestor in dir.ancestors().filter(|a| !a.as_os_str().is_empty()) {
            inner.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    fn open_append(&self, path: &Path) -> io::Result<Handle> {
        let mut inner = self.inner.lock();
        if inner.fail_open.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "fake open failure"));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !inner.dirs.contains(parent) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "parent directory missing"));
            }
        }
        inner.opens += 1;
        let buf = Arc::clone(inner.files.entry(path.to_path_buf()).or_default());
        Ok(Box::new(FakeHandle { buf }))
    }
}
