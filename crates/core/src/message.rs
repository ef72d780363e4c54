//! Message and tool event domain types.
//!
//! These are the value objects the context compactor works on. A conversation
//! is an ordered `Vec<Message>`; insertion order is the conversation order.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

/// The role of a message sender in a conversation.
///
/// Unrecognized role strings are kept as [`Role::Other`] rather than rejected,
/// so malformed history passes through compaction untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (identity, rules)
    System,
    /// Tool execution result
    Tool,
    /// Anything else found in stored history
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "tool" => Self::Tool,
            _ => Self::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: plain text, or a list of structured content parts.
///
/// Parts are kept as raw JSON; only `{"type": "text", "text": ...}` parts
/// contribute to [`MessageContent::text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
}

impl MessageContent {
    /// The textual rendering of this content.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Parts(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect();
                Cow::Owned(texts.join("\n"))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Whether a tool event is the invocation or its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEventKind {
    Call,
    Result,
}

/// A tool invocation or tool output attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEvent {
    #[serde(rename = "type")]
    pub kind: ToolEventKind,

    /// Name of the tool
    pub tool_name: String,

    /// Call arguments (call events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Map<String, serde_json::Value>>,

    /// Tool output payload (result events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Links a result to the call that produced it
    pub correlation_id: String,

    /// Set once the result payload has been shrunk
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub trimmed: bool,
}

impl ToolEvent {
    /// Create a call event.
    pub fn call(
        tool_name: impl Into<String>,
        correlation_id: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            kind: ToolEventKind::Call,
            tool_name: tool_name.into(),
            args: Some(args),
            result: None,
            correlation_id: correlation_id.into(),
            trimmed: false,
        }
    }

    /// Create a result event.
    pub fn result(
        tool_name: impl Into<String>,
        correlation_id: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        Self {
            kind: ToolEventKind::Result,
            tool_name: tool_name.into(),
            args: None,
            result: Some(result),
            correlation_id: correlation_id.into(),
            trimmed: false,
        }
    }

    pub fn is_result(&self) -> bool {
        self.kind == ToolEventKind::Result
    }
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default = "new_message_id")]
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The message body
    #[serde(default)]
    pub content: MessageContent,

    /// Tool calls and results produced during this message (assistant only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_events: Vec<ToolEvent>,
}

impl Message {
    /// Create a message with an arbitrary role.
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            tool_events: Vec::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach tool events to this message.
    pub fn with_tool_events(mut self, events: Vec<ToolEvent>) -> Self {
        self.tool_events = events;
        self
    }

    /// The textual content of this message.
    pub fn text(&self) -> Cow<'_, str> {
        self.content.text()
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Who entered stealth this week?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Who entered stealth this week?");
        assert!(msg.tool_events.is_empty());
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn unknown_role_passes_through() {
        let msg: Message =
            serde_json::from_str(r#"{"role": "developer", "content": "note"}"#).unwrap();
        assert_eq!(msg.role, Role::Other("developer".into()));

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "developer");
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::from("User".to_string()), Role::User);
        assert_eq!(Role::from("SYSTEM".to_string()), Role::System);
    }

    #[test]
    fn structured_content_renders_text_parts() {
        let msg: Message = serde_json::from_str(
            r#"{
                "role": "user",
                "content": [
                    {"type": "text", "text": "first"},
                    {"type": "image", "url": "https://example.com/a.png"},
                    {"type": "text", "text": "second"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(msg.text(), "first\nsecond");
    }

    #[test]
    fn tool_events_deserialize() {
        let msg: Message = serde_json::from_str(
            r#"{
                "role": "assistant",
                "content": "",
                "tool_events": [
                    {"type": "call", "tool_name": "search_profiles", "args": {"q": "ml"}, "correlation_id": "c1"},
                    {"type": "result", "tool_name": "search_profiles", "result": {"results": []}, "correlation_id": "c1"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(msg.tool_events.len(), 2);
        assert_eq!(msg.tool_events[0].kind, ToolEventKind::Call);
        assert!(msg.tool_events[1].is_result());
        assert!(!msg.tool_events[1].trimmed);
    }

    #[test]
    fn untrimmed_flag_is_not_serialized() {
        let event = ToolEvent::result("get_profile_details", "c9", serde_json::json!({}));
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("trimmed"));
    }
}
