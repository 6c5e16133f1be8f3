//! On-disk layout of the data directory.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

/// Resolved paths under the configured data directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.data_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding fetched PDFs.
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    /// Directory holding translator output.
    pub fn translated_dir(&self) -> PathBuf {
        self.root.join("translated")
    }

    /// Directory holding per-paper translator logs.
    pub fn log_dir(&self) -> PathBuf {
        self.translated_dir().join("logs")
    }

    /// Directory holding resource lock markers.
    pub fn lock_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn pdf_index_path(&self) -> PathBuf {
        self.root.join("pdf_cache.json")
    }

    pub fn translate_index_path(&self) -> PathBuf {
        self.root.join("translate_cache.json")
    }

    pub fn raw_pdf_path(&self, paper_id: &str) -> PathBuf {
        self.raw_dir().join(format!("{}.pdf", safe_filename(paper_id)))
    }

    pub fn mono_pdf_path(&self, paper_id: &str) -> PathBuf {
        self.translated_dir()
            .join(format!("{}-mono.pdf", safe_filename(paper_id)))
    }

    pub fn dual_pdf_path(&self, paper_id: &str) -> PathBuf {
        self.translated_dir()
            .join(format!("{}-dual.pdf", safe_filename(paper_id)))
    }

    pub fn translate_log_path(&self, paper_id: &str) -> PathBuf {
        self.log_dir()
            .join(format!("{}.pdf2zh.log", safe_filename(paper_id)))
    }

    /// Create every directory of the layout.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.raw_dir(),
            self.translated_dir(),
            self.log_dir(),
            self.lock_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Map an identifier onto a file-name-safe string.
///
/// ASCII alphanumerics, `.` and `-` pass through; every other byte (`_`
/// included) becomes `_` followed by two hex digits, so distinct ids never
/// share a file name. Dot-only names have their dots escaped too.
pub fn safe_filename(id: &str) -> String {
    if id.is_empty() {
        return "_".to_string();
    }
    let dots_only = id.bytes().all(|b| b == b'.');

    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if (b.is_ascii_alphanumeric() || b == b'.' || b == b'-') && !dots_only {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{b:02x}"));
        }
    }
    out
}

/// True when `path` is a regular file with at least one byte.
pub fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
