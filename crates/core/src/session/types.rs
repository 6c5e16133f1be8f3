//! Session data types.

use serde::{Deserialize, Serialize};

/// One entry of a search result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

impl Paper {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            summary: None,
            published: None,
            updated: None,
            pdf_url: None,
            primary_category: None,
            categories: Vec::new(),
            comment: None,
            links: Vec::new(),
        }
    }

    pub fn with_pdf_url(mut self, url: impl Into<String>) -> Self {
        self.pdf_url = Some(url.into());
        self
    }
}

/// How a caller points at a paper.
///
/// In JSON an integer is a 1-based position and a string is an ordinal,
/// an id or a title fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaperRef {
    Index(u64),
    Text(String),
}

impl From<u64> for PaperRef {
    fn from(n: u64) -> Self {
        PaperRef::Index(n)
    }
}

impl From<&str> for PaperRef {
    fn from(s: &str) -> Self {
        PaperRef::Text(s.to_string())
    }
}

impl std::fmt::Display for PaperRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaperRef::Index(n) => write!(f, "#{}", n),
            PaperRef::Text(s) => f.write_str(s),
        }
    }
}

/// Result of resolving a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaper {
    pub paper_id: String,
    /// Source locator: the paper's own URL or the arXiv fallback.
    pub pdf_url: String,
    /// The result-set entry, when the paper is still in the live set.
    pub paper: Option<Paper>,
}
