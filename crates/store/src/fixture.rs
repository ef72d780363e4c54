//! JSON fixtures: trigger rows, profiles, and likes in one document.
//!
//! ```json
//! {
//!   "events": { "bio_change": [{ "person_id": "42", "occurred_at": "2024-01-10" }] },
//!   "profiles": [{ "person_id": "42", "name": "Ada", "network_follower_count": 3 }],
//!   "likes": { "user-1": ["42"] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use signalscope_core::error::{Error, Result, StoreError};
use signalscope_core::ids::PersonId;
use signalscope_core::profile::ProfileRecord;
use signalscope_core::trigger::TriggerType;
use signalscope_signals::normalizer::RawTriggerEvent;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

use crate::profiles::{InMemoryLikes, InMemoryProfiles};
use crate::triggers::InMemoryTriggerStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub events: BTreeMap<TriggerType, Vec<RawTriggerEvent>>,
    #[serde(default)]
    pub profiles: Vec<ProfileRecord>,
    #[serde(default)]
    pub likes: BTreeMap<String, BTreeSet<PersonId>>,
}

/// The stores a fixture populates.
pub struct FixtureStores {
    pub triggers: InMemoryTriggerStore,
    pub profiles: InMemoryProfiles,
    pub likes: InMemoryLikes,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Store(StoreError::Unavailable(format!(
                "cannot read fixture {}: {e}",
                path.display()
            )))
        })?;
        let fixture = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            trigger_types = fixture.events.len(),
            rows = fixture.row_count(),
            profiles = fixture.profiles.len(),
            "Loaded fixture"
        );
        Ok(fixture)
    }

    pub fn row_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn into_stores(self) -> FixtureStores {
        FixtureStores {
            triggers: InMemoryTriggerStore::from_events(self.events),
            profiles: InMemoryProfiles::from_records(self.profiles),
            likes: InMemoryLikes::from_map(self.likes),
        }
    }
}
