//! Person identifier and handle canonicalization.
//!
//! Trigger queries, profile lookups, and tool payloads all refer to the same
//! people, but not always in the same spelling. Everything is funnelled
//! through [`PersonId::parse`] and [`canonical_handle`] before comparison.

use serde::{Deserialize, Serialize};

/// Prefixes stripped from raw person identifiers (matched case-insensitively).
const ID_PREFIXES: &[&str] = &["urn:li:person:", "urn:person:", "person:", "person/", "people/"];

/// Prefixes stripped from raw handles, after the URL scheme is removed.
/// Handles are lowercased first, so these are matched verbatim.
const HANDLE_PREFIXES: &[&str] = &[
    "www.",
    "twitter.com/",
    "x.com/",
    "linkedin.com/in/",
];

/// Canonical identifier of a tracked person.
///
/// Ordering is lexicographic on the canonical string; the merged feed relies
/// on it as its tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonId(String);

impl PersonId {
    /// Canonicalize a raw identifier. Returns `None` if nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut id = raw.trim();
        for prefix in ID_PREFIXES {
            if id.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
                id = id[prefix.len()..].trim();
                break;
            }
        }
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PersonId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("invalid person id: {raw:?}"))
    }
}

impl From<PersonId> for String {
    fn from(id: PersonId) -> Self {
        id.0
    }
}

impl std::str::FromStr for PersonId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid person id: {s:?}"))
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a social handle or profile URL into a bare lowercase handle.
///
/// `"@Jane_Doe"`, `"https://x.com/jane_doe/"` and `"jane_doe"` all map to
/// `"jane_doe"`. Stripping repeats until nothing changes, so the output is
/// its own canonical form.
pub fn canonical_handle(raw: &str) -> Option<String> {
    let mut handle = raw.trim().to_lowercase();
    loop {
        let next = strip_handle_once(&handle);
        if next.len() == handle.len() {
            break;
        }
        handle = next;
    }
    (!handle.is_empty()).then_some(handle)
}

fn strip_handle_once(handle: &str) -> String {
    let mut handle = handle.trim().trim_start_matches('@');
    for scheme in ["https://", "http://"] {
        if let Some(rest) = handle.strip_prefix(scheme) {
            handle = rest;
        }
    }
    for prefix in HANDLE_PREFIXES {
        if let Some(rest) = handle.strip_prefix(*prefix) {
            handle = rest;
        }
    }
    handle
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string()
}
