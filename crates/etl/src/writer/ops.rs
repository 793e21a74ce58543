//! FileOps trait: the filesystem seam used by the handle registry.
//!
//! `live.rs` provides the real `std::fs` implementation.
//! `fake.rs` provides an in-memory test double.

use std::io::{self, Write};
use std::path::Path;

/// Append-only file handle owned by the registry.
pub type Handle = Box<dyn Write + Send>;

pub trait FileOps: Send + Sync {
    /// Create `dir` and any missing parents.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Open `path` for appending, creating it if absent.
    fn open_append(&self, path: &Path) -> io::Result<Handle>;
}
