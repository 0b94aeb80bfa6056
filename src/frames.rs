//! Transient frame storage.
//!
//! Every pipeline run gets its own directory. Frames are files inside it and
//! are deleted by whichever stage consumes them; whatever is left when the
//! store is closed or dropped goes with the directory.

use crate::{Error, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Per-run directory holding raw and scaled frames.
#[derive(Debug)]
pub struct FrameStore {
    dir: TempDir,
}

impl FrameStore {
    /// Create a store under the system temp directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("scrollcast-frames-").tempdir()?;
        Ok(Self { dir })
    }

    /// Create a store under `root`, creating `root` if needed.
    pub fn in_dir(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("scrollcast-frames-")
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    /// `root` when given, the system temp directory otherwise.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        match root {
            Some(root) => Self::in_dir(root),
            None => Self::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn raw_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("frame{:05}.png", index))
    }

    pub fn scaled_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("frame{:05}_resized.png", index))
    }

    /// Persist a captured screenshot as raw frame `index`.
    pub fn write_raw(&self, index: usize, png: &[u8]) -> Result<RawFrame> {
        let path = self.raw_path(index);
        fs::write(&path, png)?;
        Ok(RawFrame { index, path })
    }

    /// Number of frame files currently held.
    pub fn len(&self) -> Result<usize> {
        Ok(fs::read_dir(self.dir.path())?.count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete the directory and everything left in it.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed frame store {}", path.display());
        Ok(())
    }
}

/// A screenshot at native viewport resolution.
#[derive(Debug)]
pub struct RawFrame {
    pub index: usize,
    pub path: PathBuf,
}

/// A frame downscaled to the animation resolution.
#[derive(Debug)]
pub struct ScaledFrame {
    pub index: usize,
    pub path: PathBuf,
}

impl RawFrame {
    /// Delete the backing file.
    pub fn discard(self) -> Result<()> {
        remove_frame_file(&self.path)
    }
}

impl ScaledFrame {
    /// Delete the backing file.
    pub fn discard(self) -> Result<()> {
        remove_frame_file(&self.path)
    }
}

fn remove_frame_file(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .map_err(|e| Error::Other(format!("Failed to delete frame {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_zero_padded() {
        let store = FrameStore::new().unwrap();
        assert!(store.raw_path(7).ends_with("frame00007.png"));
        assert!(store.scaled_path(123).ends_with("frame00123_resized.png"));
    }

    #[test]
    fn discard_removes_file() {
        let store = FrameStore::new().unwrap();
        let frame = store.write_raw(0, b"png").unwrap();
        assert_eq!(store.len().unwrap(), 1);
        frame.discard().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn close_and_drop_leave_root_empty() {
        let root = tempfile::tempdir().unwrap();

        let store = FrameStore::in_dir(root.path()).unwrap();
        store.write_raw(0, b"a").unwrap();
        store.write_raw(1, b"b").unwrap();
        store.close().unwrap();
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);

        {
            let store = FrameStore::in_dir(root.path()).unwrap();
            store.write_raw(0, b"a").unwrap();
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
