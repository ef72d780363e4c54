//! Conversation context compaction for SignalScope.

pub mod compactor;
pub mod compressor;
pub mod extractive;
pub mod sizer;

pub use compactor::{
    CompactionMetrics, CompactionResult, ContextSession, TurnWindow, render_transcript,
    split_turns,
};
pub use compressor::{PayloadShape, ToolKind, ToolResultCompressor};
pub use extractive::ExtractiveSummarizer;
