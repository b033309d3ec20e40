//! Filesystem utilities for atomic writes.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, VaultError};

/// Write `data` to `path` through a temp file in the same directory.
///
/// The destination either keeps its old content or gets all of `data`.
///
/// # Errors
///
/// Returns `StorageUnavailable` if the temp file cannot be created, written
/// or renamed into place.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| VaultError::StorageUnavailable("Invalid export path".to_string()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| VaultError::StorageUnavailable("Invalid export filename".to_string()))?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| VaultError::StorageUnavailable(format!("System time error: {}", e)))?
        .as_nanos();
    let temp_path = parent.join(format!(".{}.{}.tmp", filename, nanos));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| VaultError::StorageUnavailable(format!("Temp file create failed: {}", e)))?;
    let written = file.write_all(data).and_then(|()| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(VaultError::StorageUnavailable(format!(
            "Temp file write failed: {}",
            e
        )));
    }

    rename_with_fallback(&temp_path, path)
        .map_err(|e| VaultError::StorageUnavailable(format!("Atomic rename failed: {}", e)))
}

/// Rename, removing an existing destination and retrying if the first rename fails.
///
/// The temp file is removed if the retry fails too.
pub fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(temp_path, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(temp_path, destination).map_err(|retry_err| {
            let _ = fs::remove_file(temp_path);
            io::Error::new(
                retry_err.kind(),
                format!("initial: {}, retry: {}", initial_err, retry_err),
            )
        })?;
    }
    Ok(())
}
