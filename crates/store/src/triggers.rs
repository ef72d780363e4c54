//! In-memory trigger event store.

use async_trait::async_trait;
use signalscope_core::error::StoreError;
use signalscope_core::trigger::{TriggerQuery, TriggerQueryProvider, TriggerQueryResult, TriggerType};
use signalscope_signals::normalizer::{RawTriggerEvent, normalize_events};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type EventMap = BTreeMap<TriggerType, Vec<RawTriggerEvent>>;

/// Raw trigger rows grouped by trigger type.
///
/// Each type is exposed as its own [`TriggerQueryProvider`] through
/// [`InMemoryTriggerStore::provider`]; all providers share the same rows.
pub struct InMemoryTriggerStore {
    events: Arc<RwLock<EventMap>>,
}

impl InMemoryTriggerStore {
    pub fn new() -> Self {
        Self::from_events(BTreeMap::new())
    }

    pub fn from_events(events: EventMap) -> Self {
        Self {
            events: Arc::new(RwLock::new(events)),
        }
    }

    /// Append rows for one trigger type.
    pub async fn insert(&self, trigger_type: TriggerType, rows: impl IntoIterator<Item = RawTriggerEvent>) {
        self.events
            .write()
            .await
            .entry(trigger_type)
            .or_default()
            .extend(rows);
    }

    pub async fn count(&self, trigger_type: TriggerType) -> usize {
        self.events
            .read()
            .await
            .get(&trigger_type)
            .map_or(0, Vec::len)
    }

    /// Trigger types that currently hold at least one row.
    pub async fn trigger_types(&self) -> Vec<TriggerType> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn provider(&self, trigger_type: TriggerType) -> Arc<TriggerSource> {
        Arc::new(TriggerSource {
            trigger_type,
            events: Arc::clone(&self.events),
        })
    }

    /// One provider per trigger type, whether or not it has rows yet.
    pub fn providers(&self) -> Vec<Arc<dyn TriggerQueryProvider>> {
        TriggerType::ALL
            .iter()
            .map(|t| self.provider(*t) as Arc<dyn TriggerQueryProvider>)
            .collect()
    }
}

impl Default for InMemoryTriggerStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Query view over one trigger type of an [`InMemoryTriggerStore`].
pub struct TriggerSource {
    trigger_type: TriggerType,
    events: Arc<RwLock<EventMap>>,
}

#[async_trait]
impl TriggerQueryProvider for TriggerSource {
    fn trigger_type(&self) -> TriggerType {
        self.trigger_type
    }

    async fn query(&self, query: &TriggerQuery) -> Result<TriggerQueryResult, StoreError> {
        if query.trigger_type != self.trigger_type {
            return Err(StoreError::QueryFailed {
                source_name: self.trigger_type.to_string(),
                reason: format!("received a query for {}", query.trigger_type),
            });
        }

        let events = self.events.read().await;
        let rows = events.get(&self.trigger_type).map(Vec::as_slice).unwrap_or(&[]);

        let result = match &query.restrict_to {
            Some(allowed) => {
                let kept: Vec<RawTriggerEvent> = rows
                    .iter()
                    .filter(|row| row.person_id.person_id().is_some_and(|id| allowed.contains(&id)))
                    .cloned()
                    .collect();
                debug!(trigger = %self.trigger_type, kept = kept.len(), total = rows.len(), "Applied person filter");
                normalize_events(self.trigger_type, &kept, &query.window)
            }
            None => normalize_events(self.trigger_type, rows, &query.window),
        };
        Ok(result)
    }
}
