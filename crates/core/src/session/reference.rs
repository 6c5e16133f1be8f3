//! Reference parsing helpers.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Ordinals such as `2`, `#2`, `第2篇` or `第 2 篇`.
static ORDINAL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(?:第)?\s*#?\s*(\d+)\s*(?:篇)?$").ok());

/// Parse an ordinal reference into its 1-based position.
pub fn parse_ordinal(text: &str) -> Option<u64> {
    let caps = ORDINAL.as_ref()?.captures(text.trim())?;
    caps.get(1)?.as_str().parse().ok()
}

/// Canonical arXiv PDF URL for `paper_id`.
pub fn arxiv_pdf_url(paper_id: &str) -> String {
    format!("https://arxiv.org/pdf/{}.pdf", paper_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ordinal_forms() {
        assert_eq!(parse_ordinal("2"), Some(2));
        assert_eq!(parse_ordinal(" 12 "), Some(12));
        assert_eq!(parse_ordinal("#3"), Some(3));
        assert_eq!(parse_ordinal("第2篇"), Some(2));
        assert_eq!(parse_ordinal("第 4 篇"), Some(4));
    }

    #[test]
    fn test_parse_ordinal_rejects_ids_and_titles() {
        assert_eq!(parse_ordinal("2602.09017"), None);
        assert_eq!(parse_ordinal("attention"), None);
        assert_eq!(parse_ordinal("2nd"), None);
        assert_eq!(parse_ordinal(""), None);
    }

    #[test]
    fn test_arxiv_pdf_url() {
        assert_eq!(
            arxiv_pdf_url("2602.09017v1"),
            "https://arxiv.org/pdf/2602.09017v1.pdf"
        );
    }
}
