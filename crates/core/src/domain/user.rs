use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A Swarm account as returned by `GET /users?users={name}`.
///
/// Older Swarm versions capitalize the field names, so every field accepts both spellings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "user", alias = "User")]
    pub username: Option<String>,
    #[serde(default, alias = "Email")]
    pub email: Option<String>,
    #[serde(default, rename = "fullName", alias = "fullname", alias = "FullName")]
    pub full_name: Option<String>,
    #[serde(default, rename = "type", alias = "Type")]
    pub user_type: Option<String>,
    #[serde(default, alias = "Reviews", deserialize_with = "identifiers")]
    pub reviews: Vec<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: Some(username.into()), ..Self::default() }
    }
}

fn identifiers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    values
        .into_iter()
        .map(|value| match value {
            Value::String(text) => Ok(text),
            Value::Number(number) => Ok(number.to_string()),
            other => {
                Err(serde::de::Error::custom(format!("unsupported review identifier {other}")))
            }
        })
        .collect()
}
