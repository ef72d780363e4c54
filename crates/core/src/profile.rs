//! Profile records and the lookups that enrich feed entries.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::ids::{PersonId, canonical_handle};

/// Display data for a tracked person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub person_id: PersonId,

    pub name: String,

    /// Canonical handle, as produced by [`canonical_handle`]
    #[serde(
        default,
        deserialize_with = "deserialize_handle",
        skip_serializing_if = "Option::is_none"
    )]
    pub handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// How many people in the requesting user's network follow this person
    #[serde(default)]
    pub network_follower_count: u32,

    /// Whether the person changed their bio recently
    #[serde(default)]
    pub has_recent_bio_change: bool,
}

impl ProfileRecord {
    pub fn new(person_id: PersonId, name: impl Into<String>) -> Self {
        Self {
            person_id,
            name: name.into(),
            handle: None,
            headline: None,
            image_url: None,
            network_follower_count: 0,
            has_recent_bio_change: false,
        }
    }
}

fn deserialize_handle<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(canonical_handle))
}

/// Batch profile lookup.
///
/// Unknown ids are silently absent from the returned list.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn by_ids(&self, ids: &[PersonId]) -> std::result::Result<Vec<ProfileRecord>, StoreError>;
}

/// The set of people a user has previously liked.
#[async_trait]
pub trait LikedSetLookup: Send + Sync {
    async fn get(&self, user_id: &str) -> std::result::Result<BTreeSet<PersonId>, StoreError>;
}
