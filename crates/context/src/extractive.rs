//! Extractive fallback summarizer.
//!
//! Produces a deterministic digest of a transcript without calling a model:
//! the user's questions, in order, plus the tools that were used. Useful for
//! offline runs and as a stand-in when no model-backed summarizer is wired.

use async_trait::async_trait;
use signalscope_core::error::SummarizerError;
use signalscope_core::summarizer::Summarizer;

use crate::sizer;

/// Max characters kept from each user line.
const LINE_LIMIT: usize = 160;

pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn summarize(
        &self,
        _system_instruction: &str,
        transcript: &str,
        max_output_tokens: u32,
    ) -> Result<String, SummarizerError> {
        let mut questions: Vec<&str> = Vec::new();
        let mut tools: Vec<&str> = Vec::new();

        for line in transcript.lines() {
            if let Some(text) = line.strip_prefix("user: ") {
                let text = text.trim();
                if !text.is_empty() {
                    questions.push(sizer::truncate_chars(text, LINE_LIMIT));
                }
            } else if let Some(rest) = line.trim_start().strip_prefix("[tools: ") {
                for name in rest.trim_end_matches(']').split(", ") {
                    if !name.is_empty() && !tools.contains(&name) {
                        tools.push(name);
                    }
                }
            }
        }

        if questions.is_empty() {
            return Ok(String::new());
        }

        let mut summary = format!("Earlier, the user asked: {}.", questions.join("; "));
        if !tools.is_empty() {
            summary.push_str(&format!(" Tools used: {}.", tools.join(", ")));
        }

        let max_chars = (max_output_tokens as usize).saturating_mul(4);
        Ok(sizer::truncate_chars(&summary, max_chars).to_string())
    }
}
