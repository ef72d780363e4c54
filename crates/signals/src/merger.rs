//! Multi-trigger merge.
//!
//! Folds the per-trigger query results of one request into a single feed:
//! one entry per person with every trigger they matched and their most recent
//! event date. Merging is synchronous and pure; the same input set always
//! produces the same ordering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use signalscope_config::ConnectionMergePolicy;
use signalscope_core::ids::PersonId;
use signalscope_core::trigger::{ConnectionData, TriggerQueryResult, TriggerType};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One person in the merged feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedEntry {
    pub person_id: PersonId,
    /// Trigger types in first-seen order, no duplicates
    pub trigger_types_matched: Vec<TriggerType>,
    pub most_recent_date: Option<NaiveDate>,
}

impl MergedEntry {
    fn new(person_id: PersonId) -> Self {
        Self {
            person_id,
            trigger_types_matched: Vec::new(),
            most_recent_date: None,
        }
    }

    pub fn signal_count(&self) -> usize {
        self.trigger_types_matched.len()
    }

    pub fn matched(&self, trigger_type: TriggerType) -> bool {
        self.trigger_types_matched.contains(&trigger_type)
    }
}

/// One (person, trigger) contribution, kept for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEntry {
    pub person_id: PersonId,
    pub trigger_type: TriggerType,
    pub date: Option<NaiveDate>,
}

/// The merged, sorted feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedFeed {
    /// Sorted by most recent date descending, undated last, ties by person id
    pub entries: Vec<MergedEntry>,
    pub trigger_entries: Vec<TriggerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_data: Option<ConnectionData>,
}

impl MergedFeed {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep the first `limit` entries and the audit rows that belong to them.
    pub fn truncate(&mut self, limit: usize) {
        if self.entries.len() <= limit {
            return;
        }
        self.entries.truncate(limit);
        let kept: std::collections::BTreeSet<&PersonId> =
            self.entries.iter().map(|e| &e.person_id).collect();
        self.trigger_entries.retain(|t| kept.contains(&t.person_id));
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalMerger {
    policy: ConnectionMergePolicy,
}

impl SignalMerger {
    pub fn new(policy: ConnectionMergePolicy) -> Self {
        Self { policy }
    }

    /// Merge per-trigger results into one feed.
    pub fn merge(&self, results: &[TriggerQueryResult]) -> MergedFeed {
        let mut by_person: BTreeMap<PersonId, MergedEntry> = BTreeMap::new();
        let mut trigger_entries = Vec::new();
        let mut connection_data: Option<ConnectionData> = None;

        for result in results {
            let trigger_type = result.trigger_type();
            for person_id in result.person_ids() {
                let date = result.date_for(person_id);
                let entry = by_person
                    .entry(person_id.clone())
                    .or_insert_with(|| MergedEntry::new(person_id.clone()));
                entry.most_recent_date = entry.most_recent_date.max(date);
                if !entry.matched(trigger_type) {
                    entry.trigger_types_matched.push(trigger_type);
                }
                trigger_entries.push(TriggerEntry {
                    person_id: person_id.clone(),
                    trigger_type,
                    date,
                });
            }

            if let Some(data) = result.connection_data() {
                self.merge_connections(&mut connection_data, data, trigger_type);
            }
        }

        let mut entries: Vec<MergedEntry> = by_person.into_values().collect();
        entries.sort_by(|a, b| {
            b.most_recent_date
                .cmp(&a.most_recent_date)
                .then_with(|| a.person_id.cmp(&b.person_id))
        });

        debug!(
            results = results.len(),
            people = entries.len(),
            contributions = trigger_entries.len(),
            "Merged trigger results"
        );

        MergedFeed {
            entries,
            trigger_entries,
            connection_data,
        }
    }

    fn merge_connections(
        &self,
        acc: &mut Option<ConnectionData>,
        data: &ConnectionData,
        trigger_type: TriggerType,
    ) {
        match (self.policy, acc.as_mut()) {
            (_, None) => *acc = Some(data.clone()),
            (ConnectionMergePolicy::LastWins, Some(_)) => {
                warn!(
                    trigger = %trigger_type,
                    "Multiple results carry connection data; keeping the last one"
                );
                *acc = Some(data.clone());
            }
            (ConnectionMergePolicy::Union, Some(existing)) => {
                for (person, peers) in data {
                    existing
                        .entry(person.clone())
                        .or_default()
                        .extend(peers.iter().cloned());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalscope_core::trigger::TriggerDetail;
    use std::collections::BTreeSet;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn id(s: &str) -> PersonId {
        PersonId::parse(s).unwrap()
    }

    fn result(trigger_type: TriggerType, people: &[(&str, &str)]) -> TriggerQueryResult {
        people.iter().fold(TriggerQueryResult::new(trigger_type), |r, (p, date)| {
            r.with_person(id(p), d(date))
        })
    }

    fn connections(pairs: &[(&str, &[&str])]) -> ConnectionData {
        pairs
            .iter()
            .map(|(p, peers)| (id(p), peers.iter().map(|q| id(q)).collect()))
            .collect()
    }

    #[test]
    fn bio_change_and_stealth_example() {
        let results = vec![
            result(TriggerType::BioChange, &[("42", "2024-01-10")]),
            result(
                TriggerType::StealthEnter,
                &[("42", "2024-01-12"), ("7", "2024-01-01")],
            ),
        ];
        let feed = SignalMerger::default().merge(&results);

        assert_eq!(
            feed.entries,
            vec![
                MergedEntry {
                    person_id: id("42"),
                    trigger_types_matched: vec![TriggerType::BioChange, TriggerType::StealthEnter],
                    most_recent_date: Some(d("2024-01-12")),
                },
                MergedEntry {
                    person_id: id("7"),
                    trigger_types_matched: vec![TriggerType::StealthEnter],
                    most_recent_date: Some(d("2024-01-01")),
                },
            ]
        );
        assert_eq!(feed.trigger_entries.len(), 3);
    }

    #[test]
    fn empty_input_gives_empty_feed() {
        let feed = SignalMerger::default().merge(&[]);
        assert!(feed.is_empty());
        assert!(feed.trigger_entries.is_empty());
        assert!(feed.connection_data.is_none());
    }

    #[test]
    fn ties_break_by_person_id_and_undated_sort_last() {
        let results = vec![
            result(TriggerType::FreeAgent, &[("b", "2024-02-01"), ("a", "2024-02-01")]),
            TriggerQueryResult::new(TriggerType::StealthExit).with_undated_person(id("0")),
        ];
        let feed = SignalMerger::default().merge(&results);
        let order: Vec<&str> = feed.entries.iter().map(|e| e.person_id.as_str()).collect();
        assert_eq!(order, ["a", "b", "0"]);
    }

    #[test]
    fn order_is_independent_of_input_permutation() {
        let a = result(TriggerType::BioChange, &[("1", "2024-03-01"), ("2", "2024-03-05")]);
        let b = result(TriggerType::FollowIncoming, &[("2", "2024-03-02"), ("3", "2024-03-05")]);
        let c = result(TriggerType::FreeAgent, &[("1", "2024-03-09"), ("4", "2024-02-28")]);

        let merger = SignalMerger::default();
        let reference = merger.merge(&[a.clone(), b.clone(), c.clone()]);
        for perm in [
            vec![a.clone(), c.clone(), b.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![c.clone(), b.clone(), a.clone()],
        ] {
            let feed = merger.merge(&perm);
            assert_eq!(feed.entries.len(), reference.entries.len());
            for (x, y) in feed.entries.iter().zip(&reference.entries) {
                assert_eq!(x.person_id, y.person_id);
                assert_eq!(x.most_recent_date, y.most_recent_date);
                let xs: BTreeSet<_> = x.trigger_types_matched.iter().collect();
                let ys: BTreeSet<_> = y.trigger_types_matched.iter().collect();
                assert_eq!(xs, ys);
            }
        }
    }

    #[test]
    fn every_input_person_appears_exactly_once() {
        let results = vec![
            result(TriggerType::BioChange, &[("1", "2024-03-01"), ("2", "2024-03-05")]),
            result(TriggerType::BioChange, &[("2", "2024-03-07")]),
            result(TriggerType::StealthEnter, &[("3", "2024-03-02")]),
        ];
        let feed = SignalMerger::default().merge(&results);

        let expected: BTreeSet<PersonId> = results
            .iter()
            .flat_map(|r| r.person_ids().iter().cloned())
            .collect();
        let got: Vec<PersonId> = feed.entries.iter().map(|e| e.person_id.clone()).collect();
        assert_eq!(got.len(), expected.len());
        assert_eq!(got.into_iter().collect::<BTreeSet<_>>(), expected);

        let two = feed.entries.iter().find(|e| e.person_id == id("2")).unwrap();
        assert_eq!(two.trigger_types_matched, vec![TriggerType::BioChange]);
        assert_eq!(two.most_recent_date, Some(d("2024-03-07")));
    }

    #[test]
    fn last_wins_keeps_latest_connection_data() {
        let first = result(TriggerType::FollowOutgoing, &[("1", "2024-01-01")])
            .with_detail(TriggerDetail::Connections(connections(&[("1", &["9"])])));
        let second = result(TriggerType::ProfessionalConnection, &[("2", "2024-01-02")])
            .with_detail(TriggerDetail::Connections(connections(&[("2", &["8"])])));

        let feed = SignalMerger::new(ConnectionMergePolicy::LastWins).merge(&[first, second]);
        assert_eq!(feed.connection_data, Some(connections(&[("2", &["8"])])));
    }

    #[test]
    fn union_merges_adjacency() {
        let first = result(TriggerType::FollowOutgoing, &[("1", "2024-01-01")])
            .with_detail(TriggerDetail::Connections(connections(&[("1", &["9"])])));
        let second = result(TriggerType::ProfessionalConnection, &[("1", "2024-01-02")])
            .with_detail(TriggerDetail::Connections(connections(&[
                ("1", &["8"]),
                ("2", &["9"]),
            ])));

        let feed = SignalMerger::new(ConnectionMergePolicy::Union).merge(&[first, second]);
        assert_eq!(
            feed.connection_data,
            Some(connections(&[("1", &["8", "9"]), ("2", &["9"])]))
        );
    }

    #[test]
    fn truncate_drops_audit_rows_of_removed_people() {
        let results = vec![result(
            TriggerType::FreeAgent,
            &[("1", "2024-01-03"), ("2", "2024-01-02"), ("3", "2024-01-01")],
        )];
        let mut feed = SignalMerger::default().merge(&results);
        feed.truncate(2);
        assert_eq!(feed.len(), 2);
        assert!(feed.trigger_entries.iter().all(|t| t.person_id != id("3")));
    }
}
