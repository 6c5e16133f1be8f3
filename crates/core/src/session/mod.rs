//! Session memory and paper reference resolution.
//!
//! A session remembers the last result set shown to the user and the paper
//! it last acted on, so that requests can say "the second one" or nothing at
//! all instead of spelling out an id.

mod config;
mod reference;
mod store;
mod types;

pub use config::SessionConfig;
pub use reference::{arxiv_pdf_url, parse_ordinal};
pub use store::{ResolveError, SessionStore};
pub use types::{Paper, PaperRef, ResolvedPaper};

/// Session used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Map an empty or blank session id onto [`DEFAULT_SESSION`].
pub fn normalize_session_id(session_id: &str) -> &str {
    let trimmed = session_id.trim();
    if trimmed.is_empty() {
        DEFAULT_SESSION
    } else {
        trimmed
    }
}
