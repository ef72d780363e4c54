//! Size estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. Close enough
//! for logging how much a compaction pass saved; nothing here is used to
//! make hard cut decisions.

use signalscope_core::message::Message;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single message including per-message overhead.
///
/// Each message costs ~4 tokens of overhead for role name and delimiters.
/// Tool events are counted at their serialized JSON size.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let overhead = 4;
    let tool_tokens: usize = message
        .tool_events
        .iter()
        .map(|e| estimate_tokens(&serde_json::to_string(e).unwrap_or_default()))
        .sum();
    overhead + estimate_tokens(&message.text()) + tool_tokens
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Number of characters (not bytes) in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
