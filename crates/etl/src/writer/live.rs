use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use super::ops::{FileOps, Handle};

/// Real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveFs;

impl FileOps for LiveFs {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn open_append(&self, path: &Path) -> io::Result<Handle> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let path = nested.join("out_r0");

        LiveFs.create_dir_all(&nested).unwrap();
        LiveFs.open_append(&path).unwrap().write_all(b"one\n").unwrap();
        LiveFs.open_append(&path).unwrap().write_all(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
