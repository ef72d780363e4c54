//! Feed assembly: query every trigger source, merge, enrich.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use signalscope_config::SignalsConfig;
use signalscope_core::ids::PersonId;
use signalscope_core::profile::{ProfileLookup, ProfileRecord};
use signalscope_core::trigger::{
    ConnectionData, DateWindow, TriggerQuery, TriggerQueryProvider, TriggerType,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::merger::{MergedEntry, SignalMerger, TriggerEntry};

/// A feed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedQuery {
    pub window: DateWindow,
    /// Trigger types to query; `None` queries every registered provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_types: Option<BTreeSet<TriggerType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrict_to: Option<BTreeSet<PersonId>>,
    /// Max entries returned, further capped by the configured feed size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FeedQuery {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            trigger_types: None,
            network_owner: None,
            restrict_to: None,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_trigger_types(mut self, types: impl IntoIterator<Item = TriggerType>) -> Self {
        self.trigger_types = Some(types.into_iter().collect());
        self
    }

    fn trigger_query(&self, trigger_type: TriggerType) -> TriggerQuery {
        TriggerQuery {
            trigger_type,
            window: self.window,
            network_owner: self.network_owner.clone(),
            restrict_to: self.restrict_to.clone(),
        }
    }
}

/// A merged entry plus the profile it resolved to, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEntry {
    #[serde(flatten)]
    pub entry: MergedEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFeed {
    pub entries: Vec<EnrichedEntry>,
    pub trigger_entries: Vec<TriggerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_data: Option<ConnectionData>,
    /// Trigger types whose provider failed; their matches are missing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_triggers: Vec<TriggerType>,
    /// People matched before the limit was applied
    pub total_matched: usize,
}

/// Runs a feed request across all registered trigger providers.
pub struct SignalFeedService {
    providers: BTreeMap<TriggerType, Arc<dyn TriggerQueryProvider>>,
    profiles: Option<Arc<dyn ProfileLookup>>,
    merger: SignalMerger,
    max_feed_size: usize,
}

impl SignalFeedService {
    pub fn new(config: &SignalsConfig) -> Self {
        Self {
            providers: BTreeMap::new(),
            profiles: None,
            merger: SignalMerger::new(config.connection_policy),
            max_feed_size: config.max_feed_size,
        }
    }

    /// Register a provider. A later provider for the same type replaces the earlier one.
    pub fn with_provider(mut self, provider: Arc<dyn TriggerQueryProvider>) -> Self {
        let trigger_type = provider.trigger_type();
        if self.providers.insert(trigger_type, provider).is_some() {
            debug!(trigger = %trigger_type, "Replaced trigger provider");
        }
        self
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileLookup>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn registered_triggers(&self) -> Vec<TriggerType> {
        self.providers.keys().copied().collect()
    }

    pub async fn feed(&self, query: &FeedQuery) -> EnrichedFeed {
        let selected: Vec<(TriggerType, &Arc<dyn TriggerQueryProvider>)> = self
            .providers
            .iter()
            .filter(|(t, _)| query.trigger_types.as_ref().is_none_or(|set| set.contains(*t)))
            .map(|(t, p)| (*t, p))
            .collect();

        if let Some(requested) = &query.trigger_types {
            for missing in requested.iter().filter(|t| !self.providers.contains_key(*t)) {
                debug!(trigger = %missing, "No provider registered for requested trigger");
            }
        }

        let queries: Vec<_> = selected
            .iter()
            .map(|(trigger_type, provider)| {
                let trigger_query = query.trigger_query(*trigger_type);
                async move { (*trigger_type, provider.query(&trigger_query).await) }
            })
            .collect();
        let outcomes = join_all(queries).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failed_triggers = Vec::new();
        for (trigger_type, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(trigger = %trigger_type, "Trigger query failed, skipping: {e}");
                    failed_triggers.push(trigger_type);
                }
            }
        }

        let mut merged = self.merger.merge(&results);
        let total_matched = merged.len();
        let limit = query
            .limit
            .unwrap_or(self.max_feed_size)
            .min(self.max_feed_size);
        merged.truncate(limit);

        let mut profiles = self.lookup_profiles(&merged.entries).await;
        let entries = merged
            .entries
            .into_iter()
            .map(|entry| EnrichedEntry {
                profile: profiles.remove(&entry.person_id),
                entry,
            })
            .collect::<Vec<_>>();

        info!(
            queried = selected.len(),
            failed = failed_triggers.len(),
            matched = total_matched,
            returned = entries.len(),
            "Feed assembled"
        );

        EnrichedFeed {
            entries,
            trigger_entries: merged.trigger_entries,
            connection_data: merged.connection_data,
            failed_triggers,
            total_matched,
        }
    }

    async fn lookup_profiles(&self, entries: &[MergedEntry]) -> BTreeMap<PersonId, ProfileRecord> {
        let Some(lookup) = &self.profiles else {
            return BTreeMap::new();
        };
        if entries.is_empty() {
            return BTreeMap::new();
        }
        let ids: Vec<PersonId> = entries.iter().map(|e| e.person_id.clone()).collect();
        match lookup.by_ids(&ids).await {
            Ok(records) => records
                .into_iter()
                .map(|r| (r.person_id.clone(), r))
                .collect(),
            Err(e) => {
                warn!("Profile lookup failed, returning entries without profiles: {e}");
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use signalscope_core::error::StoreError;
    use signalscope_core::trigger::TriggerQueryResult;
    use std::sync::Mutex;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn id(s: &str) -> PersonId {
        PersonId::parse(s).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(d("2024-01-01"), d("2024-01-31"))
    }

    struct FixedProvider {
        trigger_type: TriggerType,
        people: Vec<(&'static str, &'static str)>,
        seen: Mutex<Vec<TriggerQuery>>,
    }

    impl FixedProvider {
        fn new(trigger_type: TriggerType, people: Vec<(&'static str, &'static str)>) -> Arc<Self> {
            Arc::new(Self {
                trigger_type,
                people,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TriggerQueryProvider for FixedProvider {
        fn trigger_type(&self) -> TriggerType {
            self.trigger_type
        }

        async fn query(&self, query: &TriggerQuery) -> Result<TriggerQueryResult, StoreError> {
            self.seen.lock().unwrap().push(query.clone());
            Ok(self
                .people
                .iter()
                .fold(TriggerQueryResult::new(self.trigger_type), |r, (p, date)| {
                    r.with_person(id(p), d(date))
                }))
        }
    }

    struct BrokenProvider(TriggerType);

    #[async_trait]
    impl TriggerQueryProvider for BrokenProvider {
        fn trigger_type(&self) -> TriggerType {
            self.0
        }

        async fn query(&self, _query: &TriggerQuery) -> Result<TriggerQueryResult, StoreError> {
            Err(StoreError::QueryFailed {
                source_name: self.0.to_string(),
                reason: "timeout".into(),
            })
        }
    }

    struct Directory(Vec<ProfileRecord>);

    #[async_trait]
    impl ProfileLookup for Directory {
        async fn by_ids(&self, ids: &[PersonId]) -> Result<Vec<ProfileRecord>, StoreError> {
            Ok(self
                .0
                .iter()
                .filter(|p| ids.contains(&p.person_id))
                .cloned()
                .collect())
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl ProfileLookup for BrokenDirectory {
        async fn by_ids(&self, _ids: &[PersonId]) -> Result<Vec<ProfileRecord>, StoreError> {
            Err(StoreError::Unavailable("directory down".into()))
        }
    }

    fn service() -> SignalFeedService {
        SignalFeedService::new(&SignalsConfig::default())
            .with_provider(FixedProvider::new(
                TriggerType::BioChange,
                vec![("42", "2024-01-10")],
            ))
            .with_provider(FixedProvider::new(
                TriggerType::StealthEnter,
                vec![("42", "2024-01-12"), ("7", "2024-01-01")],
            ))
    }

    #[test]
    fn later_provider_replaces_earlier_for_same_trigger() {
        let svc = service().with_provider(FixedProvider::new(TriggerType::BioChange, vec![]));
        let registered = svc.registered_triggers();
        assert_eq!(registered.len(), 2);
        assert!(registered.contains(&TriggerType::BioChange));
        assert!(registered.contains(&TriggerType::StealthEnter));
    }

    #[tokio::test]
    async fn merges_all_providers() {
        let feed = service().feed(&FeedQuery::new(window())).await;
        let order: Vec<&str> = feed.entries.iter().map(|e| e.entry.person_id.as_str()).collect();
        assert_eq!(order, ["42", "7"]);
        assert_eq!(
            feed.entries[0].entry.trigger_types_matched,
            vec![TriggerType::BioChange, TriggerType::StealthEnter]
        );
        assert!(feed.failed_triggers.is_empty());
        assert_eq!(feed.total_matched, 2);
    }

    #[tokio::test]
    async fn failing_provider_is_reported_and_skipped() {
        let service = service().with_provider(Arc::new(BrokenProvider(TriggerType::FreeAgent)));
        let feed = service.feed(&FeedQuery::new(window())).await;
        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.failed_triggers, vec![TriggerType::FreeAgent]);
    }

    #[tokio::test]
    async fn trigger_filter_limits_queried_providers() {
        let stealth = FixedProvider::new(TriggerType::StealthEnter, vec![("7", "2024-01-01")]);
        let bio = FixedProvider::new(TriggerType::BioChange, vec![("42", "2024-01-10")]);
        let service = SignalFeedService::new(&SignalsConfig::default())
            .with_provider(stealth.clone())
            .with_provider(bio.clone());

        let query = FeedQuery::new(window()).with_trigger_types([TriggerType::BioChange]);
        let feed = service.feed(&query).await;
        assert_eq!(feed.entries.len(), 1);
        assert!(stealth.seen.lock().unwrap().is_empty());
        assert_eq!(bio.seen.lock().unwrap()[0].window, window());
    }

    #[tokio::test]
    async fn limit_is_capped_by_max_feed_size() {
        let config = SignalsConfig {
            max_feed_size: 1,
            ..SignalsConfig::default()
        };
        let service = SignalFeedService::new(&config).with_provider(FixedProvider::new(
            TriggerType::FreeAgent,
            vec![("1", "2024-01-03"), ("2", "2024-01-02")],
        ));
        let feed = service.feed(&FeedQuery::new(window()).with_limit(10)).await;
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.total_matched, 2);
        assert!(feed.trigger_entries.iter().all(|t| t.person_id == id("1")));
    }

    #[tokio::test]
    async fn entries_are_enriched_with_profiles() {
        let mut ada = ProfileRecord::new(id("42"), "Ada");
        ada.network_follower_count = 4;
        let service = service().with_profiles(Arc::new(Directory(vec![ada.clone()])));

        let feed = service.feed(&FeedQuery::new(window())).await;
        assert_eq!(feed.entries[0].profile, Some(ada));
        assert_eq!(feed.entries[1].profile, None);
    }

    #[tokio::test]
    async fn profile_failure_degrades_to_bare_entries() {
        let service = service().with_profiles(Arc::new(BrokenDirectory));
        let feed = service.feed(&FeedQuery::new(window())).await;
        assert_eq!(feed.entries.len(), 2);
        assert!(feed.entries.iter().all(|e| e.profile.is_none()));
    }

    #[tokio::test]
    async fn no_providers_gives_empty_feed() {
        let service = SignalFeedService::new(&SignalsConfig::default());
        let feed = service.feed(&FeedQuery::new(window())).await;
        assert_eq!(feed, EnrichedFeed::default());
    }
}
