//! Trigger types and per-trigger query results.
//!
//! A trigger is a detected real-world event (a follow, a bio change, a
//! stealth transition). Each [`TriggerType`] is produced by its own
//! independent query; the signal engine merges the results into one feed.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::ids::PersonId;

/// The closed set of trigger kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Someone in the user's network started following the person
    FollowOutgoing,
    /// The person started following someone in the user's network
    FollowIncoming,
    /// A bidirectional professional connection was formed
    ProfessionalConnection,
    /// The person changed their bio
    BioChange,
    /// The person entered stealth mode
    StealthEnter,
    /// The person left stealth mode
    StealthExit,
    /// The person flagged themselves as open to new roles
    FreeAgent,
}

impl TriggerType {
    pub const ALL: [TriggerType; 7] = [
        TriggerType::FollowOutgoing,
        TriggerType::FollowIncoming,
        TriggerType::ProfessionalConnection,
        TriggerType::BioChange,
        TriggerType::StealthEnter,
        TriggerType::StealthExit,
        TriggerType::FreeAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FollowOutgoing => "follow_outgoing",
            Self::FollowIncoming => "follow_incoming",
            Self::ProfessionalConnection => "professional_connection",
            Self::BioChange => "bio_change",
            Self::StealthEnter => "stealth_enter",
            Self::StealthExit => "stealth_exit",
            Self::FreeAgent => "free_agent",
        }
    }

    /// Short human-readable label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FollowOutgoing => "followed by your network",
            Self::FollowIncoming => "following your network",
            Self::ProfessionalConnection => "new connection",
            Self::BioChange => "bio changed",
            Self::StealthEnter => "entered stealth",
            Self::StealthExit => "left stealth",
            Self::FreeAgent => "free agent",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown trigger type: {s}"))
    }
}

/// Who-connects-to-whom side channel carried by connection queries.
pub type ConnectionData = BTreeMap<PersonId, BTreeSet<PersonId>>;

/// A single observed bio change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioChange {
    pub person_id: PersonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_bio: Option<String>,
    pub current_bio: String,
    pub changed_on: NaiveDate,
}

/// Type-specific extra data attached to a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TriggerDetail {
    Connections(ConnectionData),
    BioChanges(Vec<BioChange>),
}

/// Inclusive date range for trigger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// The window ending on `to` and spanning `days` days (inclusive).
    pub fn trailing_days(to: NaiveDate, days: u32) -> Self {
        let from = to - chrono::Duration::days(i64::from(days.saturating_sub(1)));
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Parameters of a single trigger query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerQuery {
    pub trigger_type: TriggerType,
    pub window: DateWindow,
    /// Whose network the query is relative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_owner: Option<String>,
    /// Restrict results to these people
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_to: Option<BTreeSet<PersonId>>,
}

impl TriggerQuery {
    pub fn new(trigger_type: TriggerType, window: DateWindow) -> Self {
        Self {
            trigger_type,
            window,
            network_owner: None,
            restrict_to: None,
        }
    }
}

/// The result of one trigger query: who matched and when.
///
/// Built once per trigger type per request and never mutated afterwards.
/// Every person with a date is also in `person_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TriggerQueryResultRepr")]
pub struct TriggerQueryResult {
    trigger_type: TriggerType,
    person_ids: BTreeSet<PersonId>,
    most_recent_date_by_person: BTreeMap<PersonId, NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<TriggerDetail>,
}

#[derive(Deserialize)]
struct TriggerQueryResultRepr {
    trigger_type: TriggerType,
    #[serde(default)]
    person_ids: BTreeSet<PersonId>,
    #[serde(default)]
    most_recent_date_by_person: BTreeMap<PersonId, NaiveDate>,
    #[serde(default)]
    detail: Option<TriggerDetail>,
}

impl From<TriggerQueryResultRepr> for TriggerQueryResult {
    fn from(repr: TriggerQueryResultRepr) -> Self {
        let mut person_ids = repr.person_ids;
        person_ids.extend(repr.most_recent_date_by_person.keys().cloned());
        Self {
            trigger_type: repr.trigger_type,
            person_ids,
            most_recent_date_by_person: repr.most_recent_date_by_person,
            detail: repr.detail,
        }
    }
}

impl TriggerQueryResult {
    /// An empty result for the given trigger type.
    pub fn new(trigger_type: TriggerType) -> Self {
        Self {
            trigger_type,
            person_ids: BTreeSet::new(),
            most_recent_date_by_person: BTreeMap::new(),
            detail: None,
        }
    }

    /// Add a dated match. Repeated matches keep the latest date.
    pub fn with_person(mut self, id: PersonId, date: NaiveDate) -> Self {
        self.most_recent_date_by_person
            .entry(id.clone())
            .and_modify(|d| *d = (*d).max(date))
            .or_insert(date);
        self.person_ids.insert(id);
        self
    }

    /// Add a match with no known event date.
    pub fn with_undated_person(mut self, id: PersonId) -> Self {
        self.person_ids.insert(id);
        self
    }

    pub fn with_detail(mut self, detail: TriggerDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.trigger_type
    }

    /// Matched people in canonical order.
    pub fn person_ids(&self) -> &BTreeSet<PersonId> {
        &self.person_ids
    }

    pub fn date_for(&self, id: &PersonId) -> Option<NaiveDate> {
        self.most_recent_date_by_person.get(id).copied()
    }

    pub fn detail(&self) -> Option<&TriggerDetail> {
        self.detail.as_ref()
    }

    pub fn connection_data(&self) -> Option<&ConnectionData> {
        match &self.detail {
            Some(TriggerDetail::Connections(data)) => Some(data),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.person_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.person_ids.is_empty()
    }
}

/// A source of results for one trigger type.
///
/// Implementations: in-memory event store (testing / fixtures), SQL-backed
/// repositories in the hosting application.
#[async_trait]
pub trait TriggerQueryProvider: Send + Sync {
    /// The trigger type this provider answers for.
    fn trigger_type(&self) -> TriggerType;

    /// Run the query for the given window and filters.
    async fn query(&self, query: &TriggerQuery) -> std::result::Result<TriggerQueryResult, StoreError>;
}
