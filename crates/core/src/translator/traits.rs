//! Trait definitions for the translator module.

use async_trait::async_trait;

use super::error::TranslateError;
use super::types::{TranslateJob, TranslateOutput};

/// A translator that turns a PDF into a translated PDF.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Returns the name of this translator implementation.
    fn name(&self) -> &str;

    /// Translates the job's input into its output directory.
    async fn translate(&self, job: TranslateJob) -> Result<TranslateOutput, TranslateError>;

    /// Validates that the translator is properly configured and ready.
    async fn validate(&self) -> Result<(), TranslateError>;
}
