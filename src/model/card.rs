use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::null_as_default;

/// Card snapshot embedded in a webhook payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, deserialize_with = "null_as_default")]
    pub card_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomFieldValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_field_id: String,
    /// Raw field value. Single and multiple select fields carry an array of option ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Numeric fields carry their number here. Favro has been seen sending it as a string.
    #[serde(
        default,
        deserialize_with = "deserialize_loose_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<f64>,
}

impl Card {
    pub fn field(&self, custom_field_id: &str) -> Option<&CustomFieldValue> {
        self.custom_fields
            .iter()
            .find(|f| f.custom_field_id == custom_field_id)
    }
}

impl CustomFieldValue {
    /// First selected option id. Any further selections are ignored.
    pub fn first_selected(&self) -> Option<&str> {
        match &self.value {
            Some(Value::Array(items)) => items.first().and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

fn deserialize_loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
