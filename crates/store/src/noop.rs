//! No-op lookups: no profiles, nothing liked.

use async_trait::async_trait;
use signalscope_core::error::StoreError;
use signalscope_core::ids::PersonId;
use signalscope_core::profile::{LikedSetLookup, ProfileLookup, ProfileRecord};
use std::collections::BTreeSet;

pub struct NoopProfiles;

#[async_trait]
impl ProfileLookup for NoopProfiles {
    async fn by_ids(&self, _ids: &[PersonId]) -> Result<Vec<ProfileRecord>, StoreError> {
        Ok(Vec::new())
    }
}

pub struct NoopLikes;

#[async_trait]
impl LikedSetLookup for NoopLikes {
    async fn get(&self, _user_id: &str) -> Result<BTreeSet<PersonId>, StoreError> {
        Ok(BTreeSet::new())
    }
}
