//! Signal engine for SignalScope.
//!
//! Raw trigger rows are canonicalized by [`normalizer`], folded into one
//! feed by [`merger`], optionally enriched with profiles by [`feed`], and
//! ordered for a specific user by [`ranker`].

pub mod feed;
pub mod merger;
pub mod normalizer;
pub mod ranker;

pub use feed::{EnrichedEntry, EnrichedFeed, FeedQuery, SignalFeedService};
pub use merger::{MergedEntry, MergedFeed, SignalMerger, TriggerEntry};
pub use normalizer::{RawDate, RawId, RawTriggerEvent, normalize_date, normalize_events};
pub use ranker::{Candidate, RankOptions, RankedCandidate, RelevanceRanker, proximity_score, score};
