//! HTTP fetcher backed by reqwest.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::config::FetcherConfig;
use super::error::FetchError;
use super::traits::{FetchOutcome, Fetcher};
use crate::digest::hex;

/// Rewrite arXiv locators to the canonical HTTPS PDF form.
///
/// `/abs/<id>` becomes `/pdf/<id>` and `http://` becomes `https://` for
/// arxiv.org hosts. Other URLs are returned trimmed but otherwise unchanged.
pub fn normalize_pdf_url(url: &str) -> String {
    let url = url.trim();
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => return url.to_string(),
    };
    let host = rest.split('/').next().unwrap_or_default();
    let is_arxiv = host == "arxiv.org" || host.ends_with(".arxiv.org");
    if !is_arxiv {
        return url.to_string();
    }

    let scheme = if scheme.eq_ignore_ascii_case("http") {
        "https"
    } else {
        scheme
    };
    let rest = match rest.split_once("/abs/") {
        Some((host, id)) => format!("{}/pdf/{}", host, id),
        None => rest.to_string(),
    };
    format!("{}://{}", scheme, rest)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams the response body into `<dest>.part` while hashing it, then
/// renames it into place.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Client {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str, part: &Path) -> Result<FetchOutcome, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(part).await?;
        let mut hasher = Sha256::new();
        let mut size_bytes = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::request(url, e))?
        {
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            size_bytes += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        if size_bytes == 0 {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(FetchOutcome {
            size_bytes,
            sha256: hex(&hasher.finalize()),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
        let url = normalize_pdf_url(url);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = part_path(dest);
        debug!(url = %url, dest = %dest.display(), "Fetching PDF");

        let outcome = match self.download(&url, &part).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&part, dest).await?;

        info!(
            url = %url,
            dest = %dest.display(),
            size_bytes = outcome.size_bytes,
            "PDF fetched"
        );
        Ok(outcome)
    }
}
