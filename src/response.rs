use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Review of a change set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub issues: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
}

/// Merge request description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeRequestReport {
    #[serde(default, deserialize_with = "lenient_text")]
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub changes_explanation: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub problems_solved: Vec<String>,
    #[serde(default, deserialize_with = "lenient_references")]
    pub references: References,
    #[serde(default, deserialize_with = "lenient_list")]
    pub acceptance_checklist: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub setup_steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub validation_steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub side_effects: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct References {
    #[serde(default, deserialize_with = "lenient_list")]
    pub jira_tickets: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub related_mrs: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub documentation: Vec<String>,
}

/// Pull the JSON object out of free model text.
///
/// The whole reply is tried first, then the span from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Result<Value, ModelError> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    let start = text.find('{');
    let end = text.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    tracing::debug!("Unparseable model response: {}", text);
    Err(ModelError::UnparseableResponse)
}

/// Extract and deserialize a structured reply.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, ModelError> {
    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    let value = extract_json_object(text)?;
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!("Model JSON did not match the expected shape: {}", e);
        ModelError::UnparseableResponse
    })
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_text))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter_map(value_text).collect(),
        Some(other) => value_text(other).into_iter().collect(),
    })
}

fn lenient_references<'de, D>(deserializer: D) -> Result<References, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => References::default(),
    })
}
