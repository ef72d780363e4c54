//! Per-conversation context session.
//!
//! Owns the raw message history of one conversation and produces the bounded
//! message list sent to the model:
//!
//! 1. **Window**: keep the last `max_turns` user turns verbatim, pin every
//!    system message to the front, set everything else aside as "older".
//! 2. **Summarize**: past the `summarize_after` threshold, replace the older
//!    messages with a generated summary exchange.
//! 3. **Trim**: shrink oversized tool results (see [`crate::compressor`]).
//!
//! The result is cached until new messages arrive. A session is owned by one
//! caller; `optimized_messages` takes `&mut self`, so at most one pass per
//! conversation can be in flight.

use serde::{Deserialize, Serialize};
use signalscope_config::ContextConfig;
use signalscope_core::message::{Message, Role};
use signalscope_core::summarizer::Summarizer;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compressor::ToolResultCompressor;
use crate::sizer;

/// Synthetic user line that introduces an injected summary.
pub const SUMMARY_REQUEST: &str = "Summarize our conversation so far for context.";

/// Instruction sent to the summarizer along with the transcript.
pub const SUMMARY_INSTRUCTION: &str = "You condense earlier parts of a conversation between a venture investor and a network-intelligence assistant. \
Keep every person, company, and signal that was discussed, the questions the user asked, and any conclusions reached. \
Write plain prose, no preamble.";

/// Counters describing one compaction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionMetrics {
    pub raw_message_count: usize,
    pub optimized_message_count: usize,
    pub turn_count: usize,
    pub tool_trim_count: usize,
    pub summary_added: bool,
}

/// The output of a compaction pass.
#[derive(Debug, Clone, Default)]
pub struct CompactionResult {
    pub messages: Vec<Message>,
    pub metrics: CompactionMetrics,
}

/// Raw history split around the turn cutover.
#[derive(Debug, Clone, Default)]
pub struct TurnWindow {
    /// Number of user messages in the history
    pub turn_count: usize,
    /// System messages, in original order (empty when nothing was windowed)
    pub pinned: Vec<Message>,
    /// Non-system messages before the cutover
    pub older: Vec<Message>,
    /// Messages kept verbatim
    pub recent: Vec<Message>,
}

/// Split `messages` so that the last `max_turns` user turns are recent.
///
/// Below the threshold everything is recent and order is untouched.
pub fn split_turns(messages: &[Message], max_turns: usize) -> TurnWindow {
    let user_positions: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_user())
        .map(|(i, _)| i)
        .collect();
    let turn_count = user_positions.len();

    if turn_count <= max_turns {
        return TurnWindow {
            turn_count,
            pinned: Vec::new(),
            older: Vec::new(),
            recent: messages.to_vec(),
        };
    }

    let cutover = user_positions
        .get(turn_count - max_turns)
        .copied()
        .unwrap_or(messages.len());

    let mut window = TurnWindow {
        turn_count,
        ..TurnWindow::default()
    };
    for (i, msg) in messages.iter().enumerate() {
        if msg.is_system() {
            window.pinned.push(msg.clone());
        } else if i >= cutover {
            window.recent.push(msg.clone());
        } else {
            window.older.push(msg.clone());
        }
    }
    window
}

/// Render messages as a flat, role-prefixed transcript.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        let text = msg.text();
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(&format!("{}: {}\n", msg.role, text));
        }
        let mut tools: Vec<&str> = Vec::new();
        for event in msg.tool_events.iter().filter(|e| !e.is_result()) {
            if !tools.contains(&event.tool_name.as_str()) {
                tools.push(&event.tool_name);
            }
        }
        if !tools.is_empty() {
            if text.is_empty() {
                out.push_str(&format!("{}:\n", msg.role));
            }
            out.push_str(&format!("  [tools: {}]\n", tools.join(", ")));
        }
    }
    out
}

/// The context session for a single conversation.
pub struct ContextSession {
    config: ContextConfig,
    summarizer: Option<Arc<dyn Summarizer>>,
    compressor: ToolResultCompressor,
    raw: Vec<Message>,
    /// Output of the last pass; `None` once new messages arrive.
    cached: Option<CompactionResult>,
    /// Turn count the current summary was generated for.
    last_summarized_turn: Option<usize>,
    last_summary: Option<String>,
}

impl ContextSession {
    /// Create a session with no summarizer. Older turns are dropped.
    pub fn new(config: ContextConfig) -> Self {
        let compressor = ToolResultCompressor::new(config.max_tool_payload_chars);
        Self {
            config,
            summarizer: None,
            compressor,
            raw: Vec::new(),
            cached: None,
            last_summarized_turn: None,
            last_summary: None,
        }
    }

    /// Attach the summarizer used for older turns.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Append messages to the raw history and mark the cached output stale.
    pub fn add_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        let before = self.raw.len();
        for msg in messages {
            if let Role::Other(role) = &msg.role {
                debug!(role = %role, "Unrecognized message role, passing through");
            }
            self.raw.push(msg);
        }
        if self.raw.len() != before {
            self.invalidate();
        }
    }

    /// Drop the cached output; the next call recomputes it.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_stale(&self) -> bool {
        self.cached.is_none()
    }

    pub fn raw_messages(&self) -> &[Message] {
        &self.raw
    }

    /// Number of user turns in the raw history.
    pub fn turn_count(&self) -> usize {
        self.raw.iter().filter(|m| m.is_user()).count()
    }

    /// The compacted message list, recomputed only if stale.
    pub async fn optimized_messages(&mut self) -> &[Message] {
        &self.compute().await.messages
    }

    /// Run a compaction pass if stale and return the cached result.
    pub async fn compute(&mut self) -> &CompactionResult {
        let result = match self.cached.take() {
            Some(result) => result,
            None => self.run_pass().await,
        };
        self.cached.insert(result)
    }

    /// Counters for the current history.
    ///
    /// Raw counts are always current. Pass counters (optimized count, trims,
    /// summary) read zero while the session is stale.
    pub fn metrics(&self) -> CompactionMetrics {
        let pass = self
            .cached
            .as_ref()
            .map(|result| result.metrics.clone())
            .unwrap_or_default();
        CompactionMetrics {
            raw_message_count: self.raw.len(),
            turn_count: self.turn_count(),
            ..pass
        }
    }

    async fn run_pass(&mut self) -> CompactionResult {
        if self.raw.is_empty() {
            return CompactionResult::default();
        }

        let window = split_turns(&self.raw, self.config.max_turns);
        let summary = if window.older.is_empty() {
            None
        } else {
            self.summary_for(&window.older, window.turn_count).await
        };

        let mut messages =
            Vec::with_capacity(window.pinned.len() + window.recent.len() + 2);
        messages.extend(window.pinned);
        let summary_added = summary.is_some();
        if let Some(summary) = summary {
            messages.push(Message::user(SUMMARY_REQUEST));
            messages.push(Message::assistant(summary));
        }
        messages.extend(window.recent);

        let mut tool_trim_count = 0;
        if self.config.tool_trim_enabled {
            for msg in messages.iter_mut() {
                tool_trim_count += self.compressor.compress_message(msg);
            }
        }

        let metrics = CompactionMetrics {
            raw_message_count: self.raw.len(),
            optimized_message_count: messages.len(),
            turn_count: window.turn_count,
            tool_trim_count,
            summary_added,
        };

        info!(
            raw = metrics.raw_message_count,
            optimized = metrics.optimized_message_count,
            turns = metrics.turn_count,
            dropped = window.older.len(),
            tool_trims = metrics.tool_trim_count,
            summary = metrics.summary_added,
            tokens_before = sizer::estimate_messages_tokens(&self.raw),
            tokens_after = sizer::estimate_messages_tokens(&messages),
            "Context compacted"
        );

        CompactionResult { messages, metrics }
    }

    /// Summary text for the older messages, if one is due.
    ///
    /// A summary is generated at most once per turn count; later passes at
    /// the same turn count reuse it. Failures yield `None` and leave the
    /// watermark untouched so the next pass tries again.
    async fn summary_for(&mut self, older: &[Message], turn_count: usize) -> Option<String> {
        if !self.config.summarization_enabled() || turn_count <= self.config.summarize_after {
            return None;
        }
        if self.last_summarized_turn == Some(turn_count) {
            debug!(turn_count, "Reusing summary for unchanged turn count");
            return self.last_summary.clone();
        }
        let Some(summarizer) = self.summarizer.clone() else {
            debug!("No summarizer attached, older turns dropped without summary");
            return None;
        };

        let transcript = render_transcript(older);
        match summarizer
            .summarize(SUMMARY_INSTRUCTION, &transcript, self.config.summary_max_tokens)
            .await
        {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                debug!(
                    summarizer = summarizer.name(),
                    turn_count,
                    summarized_messages = older.len(),
                    "Summary generated"
                );
                self.last_summarized_turn = Some(turn_count);
                self.last_summary = Some(text.clone());
                Some(text)
            }
            Ok(_) => {
                warn!(summarizer = summarizer.name(), "Summarizer returned empty output, skipping summary");
                None
            }
            Err(e) => {
                warn!(summarizer = summarizer.name(), "Summarization failed, skipping summary: {e}");
                None
            }
        }
    }
}
