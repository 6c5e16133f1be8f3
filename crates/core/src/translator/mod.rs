//! Translator module for producing translated PDFs.
//!
//! This module provides the `Translator` trait and an implementation that
//! drives the `pdf2zh` command-line tool.
//!
//! # Example
//!
//! ```ignore
//! use arxivist_core::translator::{Pdf2zhTranslator, Translator, TranslateJob, TranslatorConfig};
//!
//! let translator = Pdf2zhTranslator::new(TranslatorConfig::default());
//! translator.validate().await?;
//!
//! let output = translator
//!     .translate(TranslateJob {
//!         paper_id: "2602.09017v1".into(),
//!         input_path: "data/raw/2602.09017v1.pdf".into(),
//!         output_dir: "data/translated".into(),
//!         log_path: "data/translated/logs/2602.09017v1.pdf2zh.log".into(),
//!         service: "bing".into(),
//!         threads: 4,
//!     })
//!     .await?;
//! println!("mono output at {}", output.mono_path.display());
//! ```

mod config;
mod error;
mod pdf2zh;
mod traits;
mod types;

pub use config::TranslatorConfig;
pub use error::TranslateError;
pub use pdf2zh::Pdf2zhTranslator;
pub use traits::Translator;
pub use types::{TranslateJob, TranslateOutput};
