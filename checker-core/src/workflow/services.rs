//! Remote text services.
//!
//! The workflow treats every service as an opaque text-in/text-out call
//! that may fail. Implementations decide how to reach the actual models.

use async_trait::async_trait;

use crate::error::RemoteServiceError;

/// The remote language services used by the practice workflow.
#[async_trait]
pub trait LanguageServices: Send + Sync {
    /// Return a grammatically corrected version of `text`, or the word
    /// "correct" when nothing needs to change.
    async fn correct_grammar(&self, text: &str) -> Result<String, RemoteServiceError>;

    /// Return free-form feedback on `text`.
    async fn feedback(&self, text: &str) -> Result<String, RemoteServiceError>;

    /// Suggest an answer to `question`. An empty reply means no suggestion.
    async fn suggest_answer(&self, question: &str) -> Result<String, RemoteServiceError>;

    /// Generate a fresh open-ended practice question.
    async fn ask_anything(&self) -> Result<String, RemoteServiceError>;

    /// Translate `text` from `language` into `target`.
    async fn translate(
        &self,
        text: &str,
        language: &str,
        target: &str,
    ) -> Result<String, RemoteServiceError>;
}
