//! Crash-safe whole-file replacement

use std::io::Write;
use std::path::{Path, PathBuf};

/// Replaces `path` with `bytes` via a synced temp file and a rename
///
/// Readers see either the old content or the new content, never a partial
/// write. Missing parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    // Write beside the target so the rename stays on one filesystem
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
