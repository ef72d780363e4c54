//! Tool result compression.
//!
//! Shrinks oversized tool outputs attached to assistant messages before they
//! are sent back to the model. Each tool name resolves to a [`ToolKind`], and
//! the kind decides the payload shape and the shrink rule:
//!
//! | Shape | Tools | Rule |
//! |-------|-------|------|
//! | List | search, group members, feed signals, trending | cap at 50 items, profile allowlist per item |
//! | Detail | full profile fetch | every array field cut to its first 3 elements |
//! | Opaque | anything else | raw text cut to the configured character limit |
//!
//! Compression is idempotent: running it on its own output changes nothing,
//! so a result only counts as trimmed the first time it actually shrinks.

use serde_json::{Map, Value, json};
use signalscope_core::ids::canonical_handle;
use signalscope_core::message::{Message, Role};

use crate::sizer;

/// Maximum items kept from a list-shaped result.
pub const LIST_ITEM_CAP: usize = 50;

/// Maximum elements kept from each array field of a detail result.
pub const DETAIL_ARRAY_CAP: usize = 3;

/// Identity and display fields kept by the profile allowlist.
const PROFILE_FIELDS: &[&str] = &["id", "person_id", "name", "handle", "headline"];

/// Signal flags kept by the profile allowlist, in `signal_summary` order.
const SIGNAL_FIELDS: &[&str] = &[
    "has_bio_change",
    "stealth_status",
    "is_trending",
    "is_free_agent",
    "network_follower_count",
    "signal_count",
];

/// Known tools, plus a fallback for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    SearchProfiles,
    GroupMembers,
    FeedSignals,
    TrendingProfiles,
    ProfileDetails,
    Other(String),
}

/// How a tool's result payload is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// An object holding a list of profiles under `key` (or a bare array)
    List { key: &'static str },
    /// A single nested object
    Detail,
    /// Unknown structure, handled as text
    Opaque,
}

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "search_profiles" => Self::SearchProfiles,
            "get_group_members" => Self::GroupMembers,
            "get_feed_signals" => Self::FeedSignals,
            "get_trending_profiles" => Self::TrendingProfiles,
            "get_profile_details" => Self::ProfileDetails,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            Self::SearchProfiles | Self::TrendingProfiles => PayloadShape::List { key: "results" },
            Self::GroupMembers => PayloadShape::List { key: "members" },
            Self::FeedSignals => PayloadShape::List { key: "signals" },
            Self::ProfileDetails => PayloadShape::Detail,
            Self::Other(_) => PayloadShape::Opaque,
        }
    }
}

/// Applies the per-tool shrink rules.
#[derive(Debug, Clone)]
pub struct ToolResultCompressor {
    max_payload_chars: usize,
}

impl ToolResultCompressor {
    /// `max_payload_chars` bounds results of unrecognized tools.
    pub fn new(max_payload_chars: usize) -> Self {
        Self { max_payload_chars }
    }

    /// Compress a single payload.
    ///
    /// Returns `None` when the payload is already within every limit.
    pub fn compress(&self, tool_name: &str, payload: &Value) -> Option<Value> {
        let compressed = match ToolKind::from_name(tool_name).shape() {
            PayloadShape::List { key } => compress_list(key, payload),
            PayloadShape::Detail => compress_detail(payload),
            PayloadShape::Opaque => self.compress_opaque(payload),
        };
        (compressed != *payload).then_some(compressed)
    }

    /// Compress every result event of an assistant message in place.
    ///
    /// Returns how many results were shrunk.
    pub fn compress_message(&self, message: &mut Message) -> usize {
        if message.role != Role::Assistant {
            return 0;
        }
        let mut trimmed = 0;
        for event in message.tool_events.iter_mut().filter(|e| e.is_result()) {
            let Some(payload) = &event.result else {
                continue;
            };
            if let Some(compressed) = self.compress(&event.tool_name, payload) {
                event.result = Some(compressed);
                event.trimmed = true;
                trimmed += 1;
            }
        }
        trimmed
    }

    fn compress_opaque(&self, payload: &Value) -> Value {
        if is_truncation_marker(payload) {
            return payload.clone();
        }
        let text = match payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let original_length = sizer::char_len(&text);
        if original_length <= self.max_payload_chars {
            return payload.clone();
        }
        json!({
            "raw_output": sizer::truncate_chars(&text, self.max_payload_chars),
            "truncated": true,
            "original_length": original_length,
        })
    }
}

fn is_truncation_marker(payload: &Value) -> bool {
    payload.get("raw_output").is_some_and(Value::is_string)
        && payload.get("truncated") == Some(&Value::Bool(true))
}

fn compress_list(key: &str, payload: &Value) -> Value {
    match payload {
        Value::Array(items) => {
            let mut wrapped = Map::new();
            wrapped.insert(key.to_string(), Value::Array(items.clone()));
            compress_list_object(key, &wrapped)
        }
        Value::Object(map) => compress_list_object(key, map),
        other => other.clone(),
    }
}

fn compress_list_object(key: &str, map: &Map<String, Value>) -> Value {
    let Some(Value::Array(items)) = map.get(key) else {
        return Value::Object(map.clone());
    };
    let mut out = map.clone();
    let kept = if items.len() > LIST_ITEM_CAP {
        if !out.contains_key("original_count") {
            out.insert("original_count".into(), json!(items.len()));
        }
        out.insert("trimmed".into(), Value::Bool(true));
        &items[..LIST_ITEM_CAP]
    } else {
        &items[..]
    };
    out.insert(
        key.to_string(),
        Value::Array(kept.iter().map(compress_profile).collect()),
    );
    Value::Object(out)
}

/// Reduce a profile object to the allowlisted fields and add a short
/// `signal_summary`. Non-objects pass through.
pub fn compress_profile(item: &Value) -> Value {
    let Value::Object(map) = item else {
        return item.clone();
    };
    let mut out = Map::new();
    for field in PROFILE_FIELDS {
        if let Some(value) = map.get(*field) {
            let value = match (*field, value) {
                ("handle", Value::String(raw)) => {
                    canonical_handle(raw).map_or_else(|| value.clone(), Value::String)
                }
                _ => value.clone(),
            };
            out.insert((*field).to_string(), value);
        }
    }
    for field in SIGNAL_FIELDS {
        if let Some(value) = map.get(*field) {
            out.insert((*field).to_string(), value.clone());
        }
    }
    match signal_summary(map) {
        Some(summary) => {
            out.insert("signal_summary".into(), Value::String(summary));
        }
        None => {
            if let Some(existing @ Value::String(_)) = map.get("signal_summary") {
                out.insert("signal_summary".into(), existing.clone());
            }
        }
    }
    Value::Object(out)
}

/// Human-readable digest of the signal flags, e.g.
/// `"bio changed, stealth: in, trending"`.
pub fn signal_summary(map: &Map<String, Value>) -> Option<String> {
    let mut parts = Vec::new();
    if map.get("has_bio_change").and_then(Value::as_bool) == Some(true) {
        parts.push("bio changed".to_string());
    }
    if let Some(status) = map.get("stealth_status").and_then(Value::as_str) {
        if !status.is_empty() {
            parts.push(format!("stealth: {status}"));
        }
    }
    if map.get("is_trending").and_then(Value::as_bool) == Some(true) {
        parts.push("trending".to_string());
    }
    if map.get("is_free_agent").and_then(Value::as_bool) == Some(true) {
        parts.push("free agent".to_string());
    }
    if let Some(n) = map.get("network_follower_count").and_then(Value::as_u64) {
        if n > 0 {
            parts.push(format!("{n} in network"));
        }
    }
    if let Some(n) = map.get("signal_count").and_then(Value::as_u64) {
        if n > 0 {
            parts.push(format!("{n} signals"));
        }
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn compress_detail(payload: &Value) -> Value {
    let Value::Object(map) = payload else {
        return payload.clone();
    };
    let out = map
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Array(items) if items.len() > DETAIL_ARRAY_CAP => {
                    Value::Array(items[..DETAIL_ARRAY_CAP].to_vec())
                }
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect();
    Value::Object(out)
}
