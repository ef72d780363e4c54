//! Raw trigger events to canonical query results.
//!
//! Trigger sources disagree on identifier and date formats. Everything that
//! enters the merger goes through here first, so downstream code only ever
//! sees [`PersonId`]s and [`NaiveDate`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signalscope_core::ids::PersonId;
use signalscope_core::trigger::{
    BioChange, ConnectionData, DateWindow, TriggerDetail, TriggerQueryResult, TriggerType,
};
use tracing::debug;

/// Date formats accepted besides RFC 3339 and epoch seconds.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
/// Shorter digit strings are never read as epoch seconds (eight is `YYYYMMDD`).
const EPOCH_MIN_DIGITS: usize = 9;

/// An event date as found in source data: text or unix seconds.
///
/// Any other JSON value is kept so the row can be counted as malformed
/// instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Epoch(i64),
    Text(String),
    Other(Value),
}

impl RawDate {
    pub fn normalize(&self) -> Option<NaiveDate> {
        match self {
            Self::Epoch(secs) => epoch_date(*secs),
            Self::Text(text) => normalize_date(text),
            Self::Other(_) => None,
        }
    }
}

/// A person identifier as found in source data: string or integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(u64),
    Other(Value),
}

impl RawId {
    pub fn person_id(&self) -> Option<PersonId> {
        match self {
            Self::Text(text) => PersonId::parse(text),
            Self::Number(n) => PersonId::parse(&n.to_string()),
            Self::Other(_) => None,
        }
    }
}

impl Default for RawId {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

impl From<&str> for RawId {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }
}

impl From<String> for RawId {
    fn from(raw: String) -> Self {
        Self::Text(raw)
    }
}

/// One row from a trigger source, before canonicalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTriggerEvent {
    /// A missing id deserializes as unusable and the row is dropped.
    #[serde(default)]
    pub person_id: RawId,

    /// Missing dates are allowed; the person is kept without a date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<RawDate>,

    /// Counterparts of a follow or connection event
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected_to: Vec<RawId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bio: Option<String>,
}

impl RawTriggerEvent {
    pub fn new(person_id: impl Into<String>, occurred_at: impl Into<String>) -> Self {
        Self {
            person_id: RawId::Text(person_id.into()),
            occurred_at: Some(RawDate::Text(occurred_at.into())),
            connected_to: Vec::new(),
            previous_bio: None,
            current_bio: None,
        }
    }
}

/// Parse a source date into a UTC calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, basic `YYYYMMDD`, RFC 3339,
/// `YYYY-MM-DD HH:MM:SS`, and unix epoch seconds (nine digits or more).
/// Anything else yields `None`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match raw.len() {
        8 => basic_date(raw),
        n if n >= EPOCH_MIN_DIGITS => raw.parse::<i64>().ok().and_then(epoch_date),
        _ => None,
    }
}

/// `YYYYMMDD`; the caller has checked for eight ASCII digits.
fn basic_date(raw: &str) -> Option<NaiveDate> {
    let year = raw.get(..4)?.parse().ok()?;
    let month = raw.get(4..6)?.parse().ok()?;
    let day = raw.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn epoch_date(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

fn carries_connections(trigger_type: TriggerType) -> bool {
    matches!(
        trigger_type,
        TriggerType::FollowOutgoing
            | TriggerType::FollowIncoming
            | TriggerType::ProfessionalConnection
    )
}

/// Build the query result for one trigger type from raw rows.
///
/// Rows with an unusable id or an unparseable date are dropped. Dated rows
/// outside `window` are filtered out. A person seen several times keeps the
/// latest date.
pub fn normalize_events(
    trigger_type: TriggerType,
    events: &[RawTriggerEvent],
    window: &DateWindow,
) -> TriggerQueryResult {
    let mut result = TriggerQueryResult::new(trigger_type);
    let mut connections = ConnectionData::new();
    let mut bio_changes: Vec<BioChange> = Vec::new();
    let mut malformed = 0usize;
    let mut out_of_window = 0usize;

    for event in events {
        let Some(person_id) = event.person_id.person_id() else {
            debug!(trigger = %trigger_type, raw_id = ?event.person_id, "Dropping event with invalid person id");
            malformed += 1;
            continue;
        };

        let date = match &event.occurred_at {
            None => None,
            Some(raw) => match raw.normalize() {
                Some(date) => Some(date),
                None => {
                    debug!(trigger = %trigger_type, person = %person_id, date = ?raw, "Dropping event with unparseable date");
                    malformed += 1;
                    continue;
                }
            },
        };

        if let Some(date) = date {
            if !window.contains(date) {
                out_of_window += 1;
                continue;
            }
        }

        if carries_connections(trigger_type) {
            let counterparts: Vec<PersonId> = event
                .connected_to
                .iter()
                .filter_map(RawId::person_id)
                .collect();
            if !counterparts.is_empty() {
                connections
                    .entry(person_id.clone())
                    .or_default()
                    .extend(counterparts);
            }
        }

        if trigger_type == TriggerType::BioChange {
            if let (Some(current_bio), Some(changed_on)) = (&event.current_bio, date) {
                bio_changes.push(BioChange {
                    person_id: person_id.clone(),
                    previous_bio: event.previous_bio.clone(),
                    current_bio: current_bio.clone(),
                    changed_on,
                });
            }
        }

        result = match date {
            Some(date) => result.with_person(person_id, date),
            None => result.with_undated_person(person_id),
        };
    }

    if !connections.is_empty() {
        result = result.with_detail(TriggerDetail::Connections(connections));
    } else if !bio_changes.is_empty() {
        bio_changes.sort_by(|a, b| {
            a.person_id
                .cmp(&b.person_id)
                .then_with(|| a.changed_on.cmp(&b.changed_on))
        });
        result = result.with_detail(TriggerDetail::BioChanges(bio_changes));
    }

    debug!(
        trigger = %trigger_type,
        rows = events.len(),
        people = result.len(),
        malformed,
        out_of_window,
        "Normalized trigger events"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn january() -> DateWindow {
        DateWindow::new(d("2024-01-01"), d("2024-01-31"))
    }

    #[test]
    fn accepts_common_date_formats() {
        let expected = Some(d("2024-01-10"));
        assert_eq!(normalize_date("2024-01-10"), expected);
        assert_eq!(normalize_date("2024/01/10"), expected);
        assert_eq!(normalize_date("2024-01-10T08:30:00Z"), expected);
        assert_eq!(normalize_date("2024-01-10 23:59:59"), expected);
        assert_eq!(normalize_date(" 2024-01-10 "), expected);
        assert_eq!(normalize_date("1704844800"), expected);
        assert_eq!(normalize_date("20240110"), expected);
    }

    #[test]
    fn short_digit_strings_are_not_epochs() {
        assert_eq!(normalize_date("20241340"), None);
        assert_eq!(normalize_date("2024011"), None);
        assert_eq!(normalize_date("86400"), None);
    }

    #[test]
    fn rfc3339_offsets_convert_to_utc() {
        assert_eq!(normalize_date("2024-01-10T23:30:00-05:00"), Some(d("2024-01-11")));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("2024-13-40"), None);
        assert_eq!(normalize_date("10/01/2024"), None);
    }

    #[test]
    fn raw_date_deserializes_from_number_or_string() {
        let n: RawDate = serde_json::from_str("1704844800").unwrap();
        let s: RawDate = serde_json::from_str("\"2024-01-10\"").unwrap();
        assert_eq!(n.normalize(), s.normalize());
    }

    #[test]
    fn integer_ids_are_accepted() {
        let rows: Vec<RawTriggerEvent> = serde_json::from_str(
            r#"[
                {"person_id": 42, "occurred_at": "2024-01-10", "connected_to": [7, "8"]},
                {"person_id": "7", "occurred_at": "2024-01-11"}
            ]"#,
        )
        .unwrap();
        let result = normalize_events(TriggerType::FollowIncoming, &rows, &january());
        let ids: Vec<&str> = result.person_ids().iter().map(PersonId::as_str).collect();
        assert_eq!(ids, ["42", "7"]);
        let peers: Vec<&str> = result.connection_data().unwrap()[&PersonId::parse("42").unwrap()]
            .iter()
            .map(PersonId::as_str)
            .collect();
        assert_eq!(peers, ["7", "8"]);
    }

    #[test]
    fn unusable_values_drop_only_their_row() {
        let rows: Vec<RawTriggerEvent> = serde_json::from_str(
            r#"[
                {"person_id": "1", "occurred_at": 1704844800.5},
                {"person_id": "2", "occurred_at": {"day": 10}},
                {"person_id": -3, "occurred_at": "2024-01-10"},
                {"person_id": null, "occurred_at": "2024-01-10"},
                {"occurred_at": "2024-01-10"},
                {"person_id": "9", "occurred_at": "2024-01-10"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 6);
        assert!(matches!(rows[0].occurred_at, Some(RawDate::Other(_))));
        assert_eq!(rows[4].person_id, RawId::default());

        let result = normalize_events(TriggerType::StealthEnter, &rows, &january());
        let ids: Vec<&str> = result.person_ids().iter().map(PersonId::as_str).collect();
        assert_eq!(ids, ["9"]);
    }

    #[test]
    fn keeps_latest_date_and_canonical_ids() {
        let events = vec![
            RawTriggerEvent::new("urn:li:person:42", "2024-01-03"),
            RawTriggerEvent::new(" 42 ", "2024-01-10"),
            RawTriggerEvent::new("person:42", "2024-01-05"),
        ];
        let result = normalize_events(TriggerType::BioChange, &events, &january());
        let id = PersonId::parse("42").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.date_for(&id), Some(d("2024-01-10")));
    }

    #[test]
    fn drops_malformed_rows_and_filters_window() {
        let events = vec![
            RawTriggerEvent::new("", "2024-01-03"),
            RawTriggerEvent::new("7", "not a date"),
            RawTriggerEvent::new("8", "2023-12-31"),
            RawTriggerEvent::new("9", "2024-01-31"),
        ];
        let result = normalize_events(TriggerType::StealthEnter, &events, &january());
        let ids: Vec<&str> = result.person_ids().iter().map(PersonId::as_str).collect();
        assert_eq!(ids, ["9"]);
    }

    #[test]
    fn undated_rows_are_kept_without_date() {
        let events = vec![RawTriggerEvent {
            occurred_at: None,
            ..RawTriggerEvent::new("5", "")
        }];
        let result = normalize_events(TriggerType::FreeAgent, &events, &january());
        let id = PersonId::parse("5").unwrap();
        assert!(result.person_ids().contains(&id));
        assert_eq!(result.date_for(&id), None);
    }

    #[test]
    fn connection_events_build_adjacency() {
        let events = vec![
            RawTriggerEvent {
                connected_to: vec!["100".into(), "101".into()],
                ..RawTriggerEvent::new("1", "2024-01-02")
            },
            RawTriggerEvent {
                connected_to: vec!["101".into(), "  ".into()],
                ..RawTriggerEvent::new("1", "2024-01-04")
            },
        ];
        let result = normalize_events(TriggerType::ProfessionalConnection, &events, &january());
        let data = result.connection_data().unwrap();
        let peers: Vec<&str> = data[&PersonId::parse("1").unwrap()]
            .iter()
            .map(PersonId::as_str)
            .collect();
        assert_eq!(peers, ["100", "101"]);
    }

    #[test]
    fn bio_change_rows_carry_old_and_new_bio() {
        let events = vec![RawTriggerEvent {
            previous_bio: Some("Engineer at BigCo".into()),
            current_bio: Some("Building something new".into()),
            ..RawTriggerEvent::new("42", "2024-01-10")
        }];
        let result = normalize_events(TriggerType::BioChange, &events, &january());
        match result.detail() {
            Some(TriggerDetail::BioChanges(changes)) => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].current_bio, "Building something new");
                assert_eq!(changes[0].changed_on, d("2024-01-10"));
            }
            other => panic!("expected bio changes, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let result = normalize_events(TriggerType::FollowIncoming, &[], &january());
        assert!(result.is_empty());
        assert!(result.detail().is_none());
    }
}
