//! Whole-file artifact output.

use crate::Result;
use log::warn;
use std::fs;
use std::path::Path;

/// Write `bytes` to `path` in one go, creating parent directories.
///
/// A failed write removes whatever part of the file made it to disk.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if let Err(e) = fs::write(path, bytes) {
        if path.is_file() {
            if let Err(rm) = fs::remove_file(path) {
                warn!("Failed to remove partial artifact {}: {}", path.display(), rm);
            }
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.bin");
        write_artifact(&path, b"first").unwrap();
        write_artifact(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn write_into_a_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_artifact(dir.path(), b"x").is_err());
    }
}
