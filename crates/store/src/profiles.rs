//! In-memory profile directory and liked-set store.

use async_trait::async_trait;
use signalscope_core::error::StoreError;
use signalscope_core::ids::PersonId;
use signalscope_core::profile::{LikedSetLookup, ProfileLookup, ProfileRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Profiles keyed by person id.
pub struct InMemoryProfiles {
    records: Arc<RwLock<BTreeMap<PersonId, ProfileRecord>>>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    /// Later records for the same person replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.person_id.clone(), r))
            .collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn upsert(&self, record: ProfileRecord) {
        self.records
            .write()
            .await
            .insert(record.person_id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryProfiles {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileLookup for InMemoryProfiles {
    /// Records come back in request order; unknown ids are skipped.
    async fn by_ids(&self, ids: &[PersonId]) -> Result<Vec<ProfileRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }
}

/// Liked people per user.
pub struct InMemoryLikes {
    by_user: Arc<RwLock<BTreeMap<String, BTreeSet<PersonId>>>>,
}

impl InMemoryLikes {
    pub fn new() -> Self {
        Self::from_map(BTreeMap::new())
    }

    pub fn from_map(by_user: BTreeMap<String, BTreeSet<PersonId>>) -> Self {
        Self {
            by_user: Arc::new(RwLock::new(by_user)),
        }
    }

    /// Record a like. Returns `false` if it was already recorded.
    pub async fn like(&self, user_id: &str, person_id: PersonId) -> bool {
        self.by_user
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .insert(person_id)
    }

    pub async fn unlike(&self, user_id: &str, person_id: &PersonId) -> bool {
        self.by_user
            .write()
            .await
            .get_mut(user_id)
            .is_some_and(|set| set.remove(person_id))
    }
}

impl Default for InMemoryLikes {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LikedSetLookup for InMemoryLikes {
    async fn get(&self, user_id: &str) -> Result<BTreeSet<PersonId>, StoreError> {
        Ok(self
            .by_user
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
