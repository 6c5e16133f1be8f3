//! Trait definitions for the fetch module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::FetchError;

/// What a successful fetch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the stored file.
    pub sha256: String,
}

/// Downloads a document to a local path.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Fetch `url` and store it at `dest`, replacing any existing file.
    ///
    /// On error `dest` is left untouched.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome, FetchError>;
}
