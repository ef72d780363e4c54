//! Relevance ranking.
//!
//! Score = network proximity + recent bio change + signal volume + liked
//! bonus. Every component is non-negative, so adding a signal to a candidate
//! never lowers its score.

use serde::{Deserialize, Serialize};
use signalscope_config::RankingConfig;
use signalscope_core::ids::PersonId;
use signalscope_core::profile::LikedSetLookup;
use signalscope_core::trigger::TriggerType;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::feed::EnrichedEntry;

pub const BIO_CHANGE_BONUS: u32 = 20;
pub const SIGNAL_POINTS: u32 = 2;
pub const SIGNAL_CAP: u32 = 20;
pub const LIKED_BONUS: u32 = 10;

/// Ranking input for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub person_id: PersonId,
    #[serde(default)]
    pub network_follower_count: u32,
    #[serde(default)]
    pub has_recent_bio_change: bool,
    #[serde(default)]
    pub signal_count: u32,
}

impl Candidate {
    pub fn new(person_id: PersonId) -> Self {
        Self {
            person_id,
            network_follower_count: 0,
            has_recent_bio_change: false,
            signal_count: 0,
        }
    }

    /// Build a candidate from a feed entry and its profile, if any.
    pub fn from_enriched(entry: &EnrichedEntry) -> Self {
        let profile = entry.profile.as_ref();
        Self {
            person_id: entry.entry.person_id.clone(),
            network_follower_count: profile.map_or(0, |p| p.network_follower_count),
            has_recent_bio_change: profile.is_some_and(|p| p.has_recent_bio_change)
                || entry.entry.matched(TriggerType::BioChange),
            signal_count: u32::try_from(entry.entry.signal_count()).unwrap_or(u32::MAX),
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: u32,
    pub liked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankOptions {
    pub include_liked_bonus: bool,
    pub limit: Option<usize>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            include_liked_bonus: true,
            limit: None,
        }
    }
}

impl From<&RankingConfig> for RankOptions {
    fn from(config: &RankingConfig) -> Self {
        Self {
            include_liked_bonus: config.liked_bonus_enabled,
            limit: config.limit,
        }
    }
}

/// Points for how many people in the user's network follow the candidate.
pub fn proximity_score(network_follower_count: u32) -> u32 {
    match network_follower_count {
        0 => 0,
        1..=2 => 20,
        3..=4 => 35,
        _ => 50,
    }
}

pub fn score(candidate: &Candidate, liked: bool) -> u32 {
    let mut total = proximity_score(candidate.network_follower_count);
    if candidate.has_recent_bio_change {
        total += BIO_CHANGE_BONUS;
    }
    total += candidate.signal_count.saturating_mul(SIGNAL_POINTS).min(SIGNAL_CAP);
    if liked {
        total += LIKED_BONUS;
    }
    total
}

pub struct RelevanceRanker {
    liked: Arc<dyn LikedSetLookup>,
}

impl RelevanceRanker {
    pub fn new(liked: Arc<dyn LikedSetLookup>) -> Self {
        Self { liked }
    }

    /// Score and sort candidates, highest first; ties by person id.
    ///
    /// If the liked set cannot be fetched, ranking proceeds as if nothing
    /// was liked.
    pub async fn rank(
        &self,
        candidates: Vec<Candidate>,
        user_id: &str,
        options: &RankOptions,
    ) -> Vec<RankedCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let liked_set = if options.include_liked_bonus {
            match self.liked.get(user_id).await {
                Ok(set) => set,
                Err(e) => {
                    warn!(user = %user_id, "Liked-set lookup failed, ranking without it: {e}");
                    BTreeSet::new()
                }
            }
        } else {
            BTreeSet::new()
        };

        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let liked = liked_set.contains(&candidate.person_id);
                RankedCandidate {
                    score: score(&candidate, liked),
                    candidate,
                    liked,
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.candidate.person_id.cmp(&b.candidate.person_id))
        });
        if let Some(limit) = options.limit {
            ranked.truncate(limit);
        }

        debug!(
            user = %user_id,
            ranked = ranked.len(),
            liked = liked_set.len(),
            top_score = ranked.first().map_or(0, |r| r.score),
            "Ranked candidates"
        );
        ranked
    }
}
