//! # SignalScope Core
//!
//! Domain types, collaborator traits, and error definitions shared by the
//! context compactor and the signal engine. Nothing in here talks to a
//! database, a model API, or the network.
//!
//! ## Layout
//!
//! - [`message`]: chat messages and the tool events attached to them
//! - [`ids`]: person identifier and handle canonicalization
//! - [`trigger`]: trigger types, per-trigger query results, and the provider trait
//! - [`profile`]: profile records plus the profile and liked-set lookups
//! - [`summarizer`]: the opaque summarization call used during compaction

pub mod error;
pub mod ids;
pub mod message;
pub mod profile;
pub mod summarizer;
pub mod trigger;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, StoreError, SummarizerError};
pub use ids::{PersonId, canonical_handle};
pub use message::{Message, MessageContent, Role, ToolEvent, ToolEventKind};
pub use profile::{LikedSetLookup, ProfileLookup, ProfileRecord};
pub use summarizer::Summarizer;
pub use trigger::{
    BioChange, ConnectionData, DateWindow, TriggerDetail, TriggerQuery, TriggerQueryProvider,
    TriggerQueryResult, TriggerType,
};
