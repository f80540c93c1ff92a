//! Atomic publication of output files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DocxError, Result};

/// Writes `bytes` to `path` through a sibling temp file and a rename, so a
/// failed write never leaves a partial file at `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DocxError::io("create directory", parent, e))?;
    }
    let temp_path = temp_path_for(path);
    let result = write_temp(&temp_path, bytes).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|source| DocxError::AtomicWriteFailed {
            temp_path: temp_path.clone(),
            target_path: path.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(())
}

fn write_temp(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).map_err(|e| DocxError::io("create", temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| DocxError::io("write", temp_path, e))?;
    file.sync_all()
        .map_err(|e| DocxError::io("sync", temp_path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.docx");
        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");
        assert_eq!(fs::read(&path).expect("read"), b"second");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("occupied");
        fs::create_dir(&target).expect("mkdir");
        fs::write(target.join("keep"), b"x").expect("write");
        let result = write_atomic(&target, b"data");
        assert!(matches!(result, Err(DocxError::AtomicWriteFailed { .. })));
        assert!(!temp_path_for(&target).exists());
    }
}
