use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub u64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReviewId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse::<u64>().map(Self)
    }
}

/// A single Swarm review as returned by `GET /reviews/{id}` or inside a list page.
///
/// Only `id` and `state` are guaranteed. The status fields are free-form on the backend
/// (string, array, or object depending on the Swarm version) and are kept as display text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub state: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub deploy_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub test_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub commit_status: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub commits: Vec<i64>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub changes: Vec<i64>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub comments: Vec<i64>,
    #[serde(default, deserialize_with = "participant_map")]
    pub participants: BTreeMap<String, Value>,
    #[serde(default)]
    pub pending: Option<bool>,
    #[serde(default, rename = "type")]
    pub review_type: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub updated: Option<i64>,
}

impl Review {
    pub fn new(id: u64, state: impl Into<String>) -> Self {
        Self { id: ReviewId(id), state: state.into(), ..Self::default() }
    }

    /// Reviews waiting on a decision (`needsReview`, `needsRevision`) can be approved or
    /// declined from a list row.
    pub fn awaits_decision(&self) -> bool {
        self.state.starts_with("needs")
    }

    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.keys().map(String::as_str).collect()
    }
}

/// One page of `GET /reviews` results, in backend relevance order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsData {
    #[serde(default, deserialize_with = "nullable_list")]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub last_seen: Option<i64>,
}

impl ReviewsData {
    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn total_count_or_zero(&self) -> u64 {
        self.total_count.unwrap_or(0)
    }

    pub fn last_seen_label(&self) -> String {
        self.last_seen.map(|cursor| cursor.to_string()).unwrap_or_else(|| "Unknown".to_owned())
    }
}

/// Wrapper used by `GET /reviews/{id}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ReviewEnvelope {
    #[serde(default)]
    pub review: Option<Review>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(other) => Some(other.to_string()),
    })
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// Swarm serializes an empty participant map as `[]`.
fn participant_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(entries)) => Ok(entries.into_iter().collect()),
        Some(Value::Array(items)) if items.is_empty() => Ok(BTreeMap::new()),
        Some(Value::Null) | None => Ok(BTreeMap::new()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "participants must be an object keyed by username, got {other}"
        ))),
    }
}
