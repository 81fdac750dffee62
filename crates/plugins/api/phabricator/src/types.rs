//! Conduit API response types.
//!
//! These types represent the raw `result` payloads of the Conduit methods
//! remaim calls. They are deserialized and then mapped to the core types.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Every Conduit answer is wrapped in this envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ConduitEnvelope {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_info: Option<String>,
}

/// Conduit serializes empty maps as `[]` and lists of objects either way;
/// collect the values in both cases.
pub fn entries<T: DeserializeOwned>(value: serde_json::Value) -> serde_json::Result<Vec<T>> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| serde_json::from_value(v))
            .collect(),
        other => serde_json::from_value(other),
    }
}

/// Ids come back as `"12"` from some methods and `12` from others.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

fn optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer).map(|s| (!s.is_empty()).then_some(s))
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id {}", n))),
        serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("invalid id {}", other))),
    }
}

// =============================================================================
// maniphest.*
// =============================================================================

/// `maniphest.querystatuses`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusesResult {
    /// key -> label
    pub status_map: BTreeMap<String, String>,
}

/// Entry of `maniphest.query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManiphestTask {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub phid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// `*.edit` result.
#[derive(Debug, Clone, Deserialize)]
pub struct EditResponse {
    pub object: EditedObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditedObject {
    #[serde(deserialize_with = "number_or_string")]
    pub id: u64,
    pub phid: String,
}

// =============================================================================
// project.*
// =============================================================================

/// Entry of `project.search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchProject {
    #[serde(deserialize_with = "number_or_string")]
    pub id: u64,
    pub phid: String,
    pub fields: SearchProjectFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProjectFields {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCursor {
    #[serde(default, deserialize_with = "optional_string")]
    pub after: Option<String>,
}

/// `project.search`
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSearchResult {
    #[serde(default)]
    pub data: Vec<SearchProject>,
    #[serde(default)]
    pub cursor: SearchCursor,
}

/// Entry of `project.query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueriedProject {
    #[serde(deserialize_with = "number_or_string")]
    pub id: u64,
    pub phid: String,
    #[serde(default)]
    pub name: String,
}

/// `project.query`; `data` is keyed by PHID, or `[]` when empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectQueryResult {
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Parameters of `project.query`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectQueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slugs: Option<Vec<String>>,
}

// =============================================================================
// user.* / file.*
// =============================================================================

/// Entry of `user.query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConduitUser {
    pub phid: String,
    #[serde(default)]
    pub real_name: String,
}

/// `file.info`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConduitFileInfo {
    pub phid: String,
    pub object_name: String,
}
