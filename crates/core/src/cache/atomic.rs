//! Crash-consistent JSON file replacement.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Temp file used while replacing `path`: `<file>.<pid>.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Serialize `value` and atomically replace `path` with it.
///
/// The data is written to a sibling temp file, flushed with `sync_all` and
/// renamed over the target, so readers only ever observe the previous or the
/// new complete document.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let body = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    let temp = temp_path_for(path);

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp)?;
        file.write_all(&body)?;
        file.sync_all()?;
        fs::rename(&temp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}
