//! Fetching raw PDFs from their source.

mod config;
mod error;
mod http;
mod traits;

pub use config::FetcherConfig;
pub use error::FetchError;
pub use http::{normalize_pdf_url, HttpFetcher};
pub use traits::{FetchOutcome, Fetcher};
