//! Mock fetcher for testing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::digest::hex;
use crate::fetch::{FetchError, FetchOutcome, Fetcher};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub url: String,
    pub dest: PathBuf,
}

/// Mock implementation of the Fetcher trait.
///
/// Writes a fixed body to the destination instead of touching the network.
///
/// # Example
///
/// ```rust,ignore
/// use arxivist_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_delay(Duration::from_millis(50)).await;
///
/// // ... run tasks ...
///
/// assert_eq!(fetcher.fetch_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    body: Arc<RwLock<Vec<u8>>>,
    next_error: Arc<RwLock<Option<FetchError>>>,
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Body written by default: a tiny but recognisable PDF header.
    pub const DEFAULT_BODY: &'static [u8] = b"%PDF-1.7\n% mock\n%%EOF\n";

    pub fn new() -> Self {
        Self {
            fetches: Arc::new(RwLock::new(Vec::new())),
            body: Arc::new(RwLock::new(Self::DEFAULT_BODY.to_vec())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// All fetches performed so far, including failed ones.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    pub async fn set_body(&self, body: impl Into<Vec<u8>>) {
        *self.body.write().await = body.into();
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Simulated transfer time.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
        self.fetches.write().await.push(RecordedFetch {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let body = self.body.read().await.clone();
        if body.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &body).await?;

        Ok(FetchOutcome {
            size_bytes: body.len() as u64,
            sha256: hex(&Sha256::digest(&body)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_writes_body() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("raw").join("p.pdf");
        let fetcher = MockFetcher::new();

        let outcome = fetcher.fetch("https://arxiv.org/pdf/p", &dest).await.unwrap();

        assert_eq!(outcome.size_bytes, MockFetcher::DEFAULT_BODY.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), MockFetcher::DEFAULT_BODY);
        assert_eq!(fetcher.fetch_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_fetcher_next_error_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("p.pdf");
        let fetcher = MockFetcher::new();
        fetcher
            .set_next_error(FetchError::HttpStatus {
                url: "u".to_string(),
                status: 503,
            })
            .await;

        assert!(fetcher.fetch("u", &dest).await.is_err());
        assert!(!dest.exists());
        assert!(fetcher.fetch("u", &dest).await.is_ok());
        assert_eq!(fetcher.fetch_count().await, 2);
    }
}
