//! Generic JSON-backed asset index.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::atomic::write_json_atomic;
use super::types::Asset;
use crate::metrics;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a, A> {
    version: u32,
    updated_at: DateTime<Utc>,
    assets: &'a BTreeMap<String, A>,
}

#[derive(Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    assets: BTreeMap<String, serde_json::Value>,
}

/// Key → record map for one asset class, persisted as a JSON snapshot.
///
/// The in-memory map is authoritative for the running process. Every mutation
/// rewrites the snapshot atomically; a failed write is logged and counted but
/// does not fail the mutation.
#[derive(Debug)]
pub struct AssetIndex<A: Asset> {
    path: PathBuf,
    assets: Mutex<BTreeMap<String, A>>,
}

impl<A: Asset> AssetIndex<A> {
    /// Load the index from `path`.
    ///
    /// A missing file yields an empty index. An unreadable or malformed file
    /// also yields an empty index, with a warning. Individual records that do
    /// not decode are skipped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let assets = load_snapshot::<A>(&path);
        debug!(
            class = %A::CLASS,
            path = %path.display(),
            records = assets.len(),
            "Asset index loaded"
        );
        Self {
            path,
            assets: Mutex::new(assets),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, A>> {
        self.assets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record for `paper_id`, whatever its status.
    pub fn get(&self, paper_id: &str) -> Option<A> {
        self.lock().get(paper_id).cloned()
    }

    /// Record for `paper_id` only if it is READY and its artifact is usable.
    pub fn get_ready(&self, paper_id: &str) -> Option<A> {
        self.get(paper_id).filter(|a| a.is_verified_ready())
    }

    pub fn list(&self) -> Vec<A> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Insert or replace the record keyed by its paper id.
    pub fn upsert(&self, mut asset: A) -> A {
        asset.touch(Utc::now());
        let mut assets = self.lock();
        assets.insert(asset.paper_id().to_string(), asset.clone());
        self.persist(&assets);
        asset
    }

    /// Mutate the record for `paper_id` in place.
    ///
    /// Returns the updated record, or `None` when there is no such record.
    pub fn update<F>(&self, paper_id: &str, f: F) -> Option<A>
    where
        F: FnOnce(&mut A),
    {
        let mut assets = self.lock();
        let asset = assets.get_mut(paper_id)?;
        f(asset);
        asset.touch(Utc::now());
        let updated = asset.clone();
        self.persist(&assets);
        Some(updated)
    }

    /// Mutate the record for `paper_id`, creating it with `init` first if absent.
    pub fn upsert_with<I, F>(&self, paper_id: &str, init: I, f: F) -> A
    where
        I: FnOnce() -> A,
        F: FnOnce(&mut A),
    {
        let mut assets = self.lock();
        let asset = assets.entry(paper_id.to_string()).or_insert_with(init);
        f(asset);
        asset.touch(Utc::now());
        let updated = asset.clone();
        self.persist(&assets);
        updated
    }

    /// Remove the record for `paper_id`. Returns whether one existed.
    pub fn delete(&self, paper_id: &str) -> bool {
        let mut assets = self.lock();
        let existed = assets.remove(paper_id).is_some();
        if existed {
            self.persist(&assets);
        }
        existed
    }

    fn persist(&self, assets: &BTreeMap<String, A>) {
        let snapshot = SnapshotOut {
            version: SNAPSHOT_VERSION,
            updated_at: Utc::now(),
            assets,
        };
        if let Err(e) = write_json_atomic(&self.path, &snapshot) {
            metrics::CACHE_WRITE_FAILURES
                .with_label_values(&[A::CLASS.as_str()])
                .inc();
            warn!(
                class = %A::CLASS,
                path = %self.path.display(),
                error = %e,
                "Failed to write asset index snapshot"
            );
        }
    }
}

fn load_snapshot<A: Asset>(path: &Path) -> BTreeMap<String, A> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read asset index; starting empty");
            return BTreeMap::new();
        }
    };

    let snapshot: SnapshotIn = match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed asset index; starting empty");
            return BTreeMap::new();
        }
    };

    if let Some(version) = snapshot.version {
        if version != SNAPSHOT_VERSION {
            warn!(path = %path.display(), version, "Unexpected asset index version; loading anyway");
        }
    }

    let mut assets = BTreeMap::new();
    for (key, value) in snapshot.assets {
        match serde_json::from_value::<A>(value) {
            Ok(asset) => {
                assets.insert(key, asset);
            }
            Err(e) => {
                warn!(path = %path.display(), key = %key, error = %e, "Skipping undecodable asset record");
            }
        }
    }
    assets
}
