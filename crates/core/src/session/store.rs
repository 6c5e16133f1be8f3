//! Per-session short-term memory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use super::reference::{arxiv_pdf_url, parse_ordinal};
use super::types::{Paper, PaperRef, ResolvedPaper};
use super::SessionConfig;

/// Reasons a reference could not be resolved. All of them mean "not found".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no reference given and session '{0}' has no recently used paper")]
    NoActivePaper(String),

    #[error("session '{0}' has no recent result set to resolve against")]
    NoPapers(String),

    #[error("position {index} is out of range (result set has {len} papers)")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("no paper in the result set matches '{0}'")]
    NoMatch(String),
}

#[derive(Debug, Default)]
struct SessionState {
    papers: Vec<Paper>,
    papers_set_at: Option<Instant>,
    last_active: Option<String>,
    active_set_at: Option<Instant>,
}

fn is_live(set_at: Option<Instant>, ttl: Duration) -> bool {
    set_at.is_some_and(|t| t.elapsed() < ttl)
}

impl SessionState {
    fn live_papers(&self, ttl: Duration) -> &[Paper] {
        if is_live(self.papers_set_at, ttl) {
            &self.papers
        } else {
            &[]
        }
    }

    fn live_active(&self, ttl: Duration) -> Option<&str> {
        if is_live(self.active_set_at, ttl) {
            self.last_active.as_deref()
        } else {
            None
        }
    }
}

/// Session memory keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the session's result set, truncated to `max_papers`.
    pub fn set_last_papers(&self, session_id: &str, mut papers: Vec<Paper>) -> usize {
        papers.truncate(self.config.max_papers);
        let count = papers.len();
        let mut sessions = self.lock();
        let state = sessions.entry(session_id.to_string()).or_default();
        state.papers = papers;
        state.papers_set_at = Some(Instant::now());
        debug!(session_id = %session_id, count, "Session result set replaced");
        count
    }

    /// The live result set; empty when never set or expired.
    pub fn last_papers(&self, session_id: &str) -> Vec<Paper> {
        self.lock()
            .get(session_id)
            .map(|s| s.live_papers(self.config.papers_ttl()).to_vec())
            .unwrap_or_default()
    }

    pub fn set_last_active(&self, session_id: &str, paper_id: &str) {
        let mut sessions = self.lock();
        let state = sessions.entry(session_id.to_string()).or_default();
        state.last_active = Some(paper_id.to_string());
        state.active_set_at = Some(Instant::now());
    }

    /// The live last-active paper id.
    pub fn last_active(&self, session_id: &str) -> Option<String> {
        self.lock()
            .get(session_id)
            .and_then(|s| s.live_active(self.config.active_ttl()))
            .map(str::to_string)
    }

    /// Resolve `reference` against the session.
    ///
    /// `None` means "the paper I used last". Otherwise, in order: a 1-based
    /// position (integer or ordinal text), an exact id, then the first title
    /// containing the text, case-insensitively.
    pub fn resolve(
        &self,
        session_id: &str,
        reference: Option<&PaperRef>,
    ) -> Result<ResolvedPaper, ResolveError> {
        let sessions = self.lock();
        let state = sessions.get(session_id);
        let papers = state
            .map(|s| s.live_papers(self.config.papers_ttl()))
            .unwrap_or(&[]);

        let Some(reference) = reference else {
            let paper_id = state
                .and_then(|s| s.live_active(self.config.active_ttl()))
                .ok_or_else(|| ResolveError::NoActivePaper(session_id.to_string()))?;
            let paper = papers.iter().find(|p| p.id == paper_id).cloned();
            return Ok(resolved(paper_id.to_string(), paper));
        };

        if papers.is_empty() {
            return Err(ResolveError::NoPapers(session_id.to_string()));
        }

        let paper = match reference {
            PaperRef::Index(n) => by_position(papers, *n)?,
            PaperRef::Text(text) => {
                let text = text.trim();
                if let Some(n) = parse_ordinal(text) {
                    by_position(papers, n)?
                } else {
                    by_id_or_title(papers, text)
                        .ok_or_else(|| ResolveError::NoMatch(text.to_string()))?
                }
            }
        };
        Ok(resolved(paper.id.clone(), Some(paper.clone())))
    }

    /// Drop sessions whose result set and last-active pointer have both expired.
    ///
    /// Returns the number of sessions removed.
    pub fn purge_expired(&self) -> usize {
        let papers_ttl = self.config.papers_ttl();
        let active_ttl = self.config.active_ttl();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| {
            is_live(s.papers_set_at, papers_ttl) || is_live(s.active_set_at, active_ttl)
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }
}

fn resolved(paper_id: String, paper: Option<Paper>) -> ResolvedPaper {
    let pdf_url = paper
        .as_ref()
        .and_then(|p| p.pdf_url.clone())
        .unwrap_or_else(|| arxiv_pdf_url(&paper_id));
    ResolvedPaper {
        paper_id,
        pdf_url,
        paper,
    }
}

fn by_position(papers: &[Paper], index: u64) -> Result<&Paper, ResolveError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| papers.get(i))
        .ok_or(ResolveError::IndexOutOfRange {
            index,
            len: papers.len(),
        })
}

fn by_id_or_title<'a>(papers: &'a [Paper], text: &str) -> Option<&'a Paper> {
    if text.is_empty() {
        return None;
    }
    if let Some(paper) = papers.iter().find(|p| p.id == text) {
        return Some(paper);
    }
    let needle = text.to_lowercase();
    papers
        .iter()
        .find(|p| p.title.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn papers() -> Vec<Paper> {
        vec![
            Paper::new("2601.00001", "Attention Is All You Need").with_pdf_url("https://arxiv.org/pdf/2601.00001v2"),
            Paper::new("2601.00002", "Diffusion Models Beat GANs"),
            Paper::new("2601.00003", "Scaling Laws for Neural Language Models"),
        ]
    }

    fn store() -> SessionStore {
        let store = SessionStore::new(SessionConfig::default());
        store.set_last_papers("s", papers());
        store
    }

    fn expired_config() -> SessionConfig {
        SessionConfig {
            papers_ttl_secs: 0,
            active_ttl_secs: 0,
            max_papers: 50,
        }
    }

    #[test]
    fn test_resolve_by_integer_position() {
        let resolved = store().resolve("s", Some(&PaperRef::Index(2))).unwrap();
        assert_eq!(resolved.paper_id, "2601.00002");
        assert_eq!(resolved.pdf_url, "https://arxiv.org/pdf/2601.00002.pdf");
    }

    #[test]
    fn test_resolve_by_ordinal_text() {
        let store = store();
        for text in ["2", "#2", "第2篇"] {
            let resolved = store.resolve("s", Some(&PaperRef::from(text))).unwrap();
            assert_eq!(resolved.paper_id, "2601.00002", "reference {text:?}");
        }
    }

    #[test]
    fn test_resolve_position_out_of_range() {
        let store = store();
        assert_eq!(
            store.resolve("s", Some(&PaperRef::Index(4))).unwrap_err(),
            ResolveError::IndexOutOfRange { index: 4, len: 3 }
        );
        assert!(store.resolve("s", Some(&PaperRef::Index(0))).is_err());
    }

    #[test]
    fn test_resolve_by_exact_id_keeps_paper_url() {
        let resolved = store()
            .resolve("s", Some(&PaperRef::from("2601.00001")))
            .unwrap();
        assert_eq!(resolved.pdf_url, "https://arxiv.org/pdf/2601.00001v2");
        assert!(resolved.paper.is_some());
    }

    #[test]
    fn test_resolve_by_title_substring_case_insensitive() {
        let resolved = store()
            .resolve("s", Some(&PaperRef::from("scaling LAWS")))
            .unwrap();
        assert_eq!(resolved.paper_id, "2601.00003");
    }

    #[test]
    fn test_resolve_unknown_text() {
        let store = store();
        assert!(matches!(
            store.resolve("s", Some(&PaperRef::from("quantum gravity"))),
            Err(ResolveError::NoMatch(_))
        ));
        assert!(matches!(
            store.resolve("s", Some(&PaperRef::from("   "))),
            Err(ResolveError::NoMatch(_))
        ));
    }

    #[test]
    fn test_expired_result_set_is_not_found() {
        let store = SessionStore::new(expired_config());
        store.set_last_papers("s", papers());
        assert!(store.last_papers("s").is_empty());
        assert_eq!(
            store.resolve("s", Some(&PaperRef::Index(2))).unwrap_err(),
            ResolveError::NoPapers("s".into())
        );
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let store = store();
        assert!(matches!(
            store.resolve("other", Some(&PaperRef::Index(1))),
            Err(ResolveError::NoPapers(_))
        ));
        assert!(matches!(
            store.resolve("other", None),
            Err(ResolveError::NoActivePaper(_))
        ));
    }

    #[test]
    fn test_none_uses_last_active() {
        let store = store();
        store.set_last_active("s", "2601.00002");
        let resolved = store.resolve("s", None).unwrap();
        assert_eq!(resolved.paper_id, "2601.00002");
        assert!(resolved.paper.is_some());
    }

    #[test]
    fn test_none_with_active_outside_result_set_uses_fallback_url() {
        let store = SessionStore::new(SessionConfig::default());
        store.set_last_active("s", "2501.12345");
        let resolved = store.resolve("s", None).unwrap();
        assert_eq!(resolved.paper_id, "2501.12345");
        assert_eq!(resolved.pdf_url, "https://arxiv.org/pdf/2501.12345.pdf");
        assert!(resolved.paper.is_none());
    }

    #[test]
    fn test_expired_last_active_is_not_found() {
        let store = SessionStore::new(expired_config());
        store.set_last_active("s", "2501.12345");
        assert_eq!(store.last_active("s"), None);
        assert!(store.resolve("s", None).is_err());
    }

    #[test]
    fn test_result_set_is_truncated() {
        let store = SessionStore::new(SessionConfig {
            max_papers: 2,
            ..SessionConfig::default()
        });
        assert_eq!(store.set_last_papers("s", papers()), 2);
        assert_eq!(store.last_papers("s").len(), 2);
    }

    #[test]
    fn test_purge_expired() {
        let live = store();
        live.set_last_active("t", "x");
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.session_count(), 2);

        let expired = SessionStore::new(expired_config());
        expired.set_last_papers("s", papers());
        expired.set_last_active("t", "x");
        assert_eq!(expired.purge_expired(), 2);
        assert_eq!(expired.session_count(), 0);
    }
}
