//! Marker-file lock implementation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::LockConfig;
use crate::layout::safe_filename;
use crate::metrics;

/// Errors from resource lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock was still held when the wait budget ran out.
    #[error("resource busy: lock '{key}' still held after {waited_ms}ms")]
    Busy { key: String, waited_ms: u64 },

    /// The marker could not be created or inspected.
    #[error("lock I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Contents of a marker file.
#[derive(Debug, Serialize, Deserialize)]
struct Marker {
    key: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
    /// Distinguishes this holder from a later holder of the same key.
    token: String,
}

/// Per-key mutual exclusion backed by marker files in one directory.
#[derive(Debug, Clone)]
pub struct ResourceLock {
    dir: PathBuf,
    config: LockConfig,
}

impl ResourceLock {
    pub fn new(dir: impl Into<PathBuf>, config: LockConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Path of the marker file for `key`.
    pub fn marker_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", safe_filename(key)))
    }

    /// Acquire the lock for `key`, waiting up to the configured timeout.
    ///
    /// The returned guard releases the lock when dropped.
    pub async fn acquire(&self, key: &str) -> Result<LockGuard, LockError> {
        let path = self.marker_path(key);
        fs::create_dir_all(&self.dir).map_err(|e| LockError::io(&self.dir, e))?;

        let started = Instant::now();
        let timeout = self.config.timeout();
        let poll = self.config.poll_interval();

        loop {
            let token = uuid::Uuid::new_v4().simple().to_string();
            match create_marker(&path, key, &token) {
                Ok(()) => {
                    let waited = started.elapsed();
                    metrics::LOCK_WAIT.observe(waited.as_secs_f64());
                    debug!(key = %key, waited_ms = waited.as_millis() as u64, "Lock acquired");
                    return Ok(self.guard(key, path, token));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(LockError::io(&path, e)),
            }

            match self.marker_age(&path) {
                // Released between our create attempt and the age check.
                None => continue,
                Some(age) if age >= self.config.stale_after() => {
                    if self.reclaim_marker(&path, key) {
                        continue;
                    }
                }
                Some(_) => {}
            }

            let waited = started.elapsed();
            if waited >= timeout {
                metrics::LOCK_WAIT.observe(waited.as_secs_f64());
                return Err(LockError::Busy {
                    key: key.to_string(),
                    waited_ms: waited.as_millis() as u64,
                });
            }
            tokio::time::sleep(poll.min(timeout - waited)).await;
        }
    }

    /// Single acquisition attempt without waiting.
    ///
    /// Returns `Ok(None)` when a live marker is present.
    pub fn try_acquire(&self, key: &str) -> Result<Option<LockGuard>, LockError> {
        let path = self.marker_path(key);
        fs::create_dir_all(&self.dir).map_err(|e| LockError::io(&self.dir, e))?;

        for _ in 0..2 {
            let token = uuid::Uuid::new_v4().simple().to_string();
            match create_marker(&path, key, &token) {
                Ok(()) => {
                    debug!(key = %key, "Lock acquired");
                    return Ok(Some(self.guard(key, path, token)));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(LockError::io(&path, e)),
            }
            match self.marker_age(&path) {
                // Released in between; try once more.
                None => continue,
                Some(age) if age >= self.config.stale_after() && self.reclaim_marker(&path, key) => {
                    continue
                }
                Some(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Remove the marker for `key` regardless of who holds it.
    ///
    /// Releasing a lock that is not held is a no-op.
    pub fn release(&self, key: &str) {
        let path = self.marker_path(key);
        match fs::remove_file(&path) {
            Ok(()) => debug!(key = %key, "Lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(key = %key, error = %e, "Failed to remove lock marker"),
        }
    }

    /// Whether a live (non-stale) marker exists for `key`.
    pub fn is_held(&self, key: &str) -> bool {
        self.marker_age(&self.marker_path(key))
            .is_some_and(|age| age < self.config.stale_after())
    }

    /// Remove every stale marker in the lock directory.
    ///
    /// Returns the keys of the reclaimed markers.
    pub fn reclaim_stale(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to scan lock directory");
                return Vec::new();
            }
        };

        let mut reclaimed = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            let stale = self
                .marker_age(&path)
                .is_some_and(|age| age >= self.config.stale_after());
            if !stale {
                continue;
            }
            let key = read_marker(&path)
                .map(|m| m.key)
                .or_else(|| {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                })
                .unwrap_or_default();
            if self.reclaim_marker(&path, &key) {
                reclaimed.push(key);
            }
        }
        reclaimed
    }

    /// Wrap a freshly created marker in a guard.
    ///
    /// Inside a Tokio runtime the guard also keeps the marker's mtime fresh,
    /// so a long-running holder is never mistaken for a crashed one.
    fn guard(&self, key: &str, path: PathBuf, token: String) -> LockGuard {
        let heartbeat = tokio::runtime::Handle::try_current().ok().map(|handle| {
            handle.spawn(keep_fresh(
                path.clone(),
                token.clone(),
                self.config.heartbeat_interval(),
            ))
        });
        LockGuard {
            key: key.to_string(),
            path,
            token,
            released: false,
            heartbeat,
        }
    }

    fn marker_age(&self, path: &Path) -> Option<Duration> {
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Take a stale marker out of the way.
    ///
    /// The marker is first renamed to a private tombstone so that only one
    /// contender can claim it. If the tombstone turns out to be fresh (another
    /// contender reclaimed and re-acquired in between), it is linked back.
    fn reclaim_marker(&self, path: &Path, key: &str) -> bool {
        let tombstone = path.with_extension(format!(
            "lock.{}.reclaim",
            uuid::Uuid::new_v4().simple()
        ));
        if fs::rename(path, &tombstone).is_err() {
            return false;
        }

        let still_stale = self
            .marker_age(&tombstone)
            .is_some_and(|age| age >= self.config.stale_after());
        if !still_stale {
            // Restoring fails only if someone else already holds the key again.
            let _ = fs::hard_link(&tombstone, path);
            let _ = fs::remove_file(&tombstone);
            return false;
        }

        let holder = read_marker(&tombstone);
        let _ = fs::remove_file(&tombstone);
        metrics::LOCKS_RECLAIMED.inc();
        warn!(
            key = %key,
            holder_pid = holder.as_ref().map(|m| m.pid),
            acquired_at = ?holder.as_ref().map(|m| m.acquired_at),
            "Reclaimed stale lock marker"
        );
        true
    }
}

fn create_marker(path: &Path, key: &str, token: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let marker = Marker {
        key: key.to_string(),
        pid: std::process::id(),
        acquired_at: Utc::now(),
        token: token.to_string(),
    };
    let body = serde_json::to_vec(&marker).map_err(io::Error::other)?;
    if let Err(e) = file.write_all(&body) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

/// Touch the marker every `period` for as long as it carries `token`.
async fn keep_fresh(path: PathBuf, token: String, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        match read_marker(&path) {
            Some(marker) if marker.token == token => {}
            _ => return,
        }
        let touched = OpenOptions::new()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        if let Err(e) = touched {
            debug!(path = %path.display(), error = %e, "Failed to refresh lock marker");
        }
    }
}

fn read_marker(path: &Path) -> Option<Marker> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Held lock. Dropping it removes the marker.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    path: PathBuf,
    token: String,
    released: bool,
    heartbeat: Option<tokio::task::JoinHandle<()>>,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release explicitly. Equivalent to dropping the guard.
    pub fn release(mut self) {
        self.remove_marker();
    }

    fn remove_marker(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        if self.released {
            return;
        }
        self.released = true;

        // A marker reclaimed as stale may now belong to another holder.
        match read_marker(&self.path) {
            Some(marker) if marker.token == self.token => {}
            Some(_) => {
                warn!(key = %self.key, "Lock was reclaimed while held; leaving new holder's marker");
                return;
            }
            None => return,
        }

        match fs::remove_file(&self.path) {
            Ok(()) => debug!(key = %self.key, "Lock released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(key = %self.key, error = %e, "Failed to remove lock marker"),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.remove_marker();
    }
}
