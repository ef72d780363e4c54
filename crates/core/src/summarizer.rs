//! Summarizer trait: the one external call made during context compaction.
//!
//! The model behind it is opaque. It receives a system instruction and a
//! flat transcript and returns free text, or fails.

use async_trait::async_trait;

use crate::error::SummarizerError;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// The summarizer name (for logging).
    fn name(&self) -> &str;

    /// Summarize `transcript`, keeping the output within `max_output_tokens`.
    async fn summarize(
        &self,
        system_instruction: &str,
        transcript: &str,
        max_output_tokens: u32,
    ) -> std::result::Result<String, SummarizerError>;
}
