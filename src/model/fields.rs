use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Marker left in the compiled-in table until it is edited for a real organization.
pub const PLACEHOLDER_ID: &str = "InsertRelevantId";

/// Weight handed out to the options of a select field, by position.
pub const OPTION_WEIGHTS: [f64; 5] = [1.0, 3.0, 5.0, 8.0, 10.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldItem {
    pub id: String,
    pub value: f64,
}

/// A select custom field and the weight of each of its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub custom_field_id: String,
    pub items: Vec<FieldItem>,
}

impl FieldMapping {
    pub fn weight_of(&self, item_id: &str) -> Option<f64> {
        self.items.iter().find(|i| i.id == item_id).map(|i| i.value)
    }

    fn placeholder() -> Self {
        Self {
            custom_field_id: PLACEHOLDER_ID.into(),
            items: OPTION_WEIGHTS
                .iter()
                .map(|&value| FieldItem {
                    id: PLACEHOLDER_ID.into(),
                    value,
                })
                .collect(),
        }
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        check_id(name, &self.custom_field_id)?;
        if self.items.is_empty() {
            return Err(ConfigError::EmptyMapping(name));
        }
        for item in &self.items {
            check_id(name, &item.id)?;
            if !item.value.is_finite() || item.value <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    field: name,
                    item: item.id.clone(),
                    value: item.value,
                });
            }
        }
        Ok(())
    }
}

/// The four RICE inputs plus the numeric field the score is written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappings {
    pub score_field_id: String,
    pub reach: FieldMapping,
    pub impact: FieldMapping,
    pub confidence: FieldMapping,
    pub effort: FieldMapping,
}

impl FieldMappings {
    /// Compiled-in table. Replace every id with the values printed by `rice-calculator fields`.
    ///
    /// Option order per field:
    /// - reach: none, minority, some, majority, all
    /// - impact: none, minor inconvenience, moderate, significant, critical
    /// - confidence: no evidence, low, medium, high, absolute certainty
    /// - effort: trivial, minor, moderate, significant, major
    pub fn builtin() -> Self {
        Self {
            score_field_id: PLACEHOLDER_ID.into(),
            reach: FieldMapping::placeholder(),
            impact: FieldMapping::placeholder(),
            confidence: FieldMapping::placeholder(),
            effort: FieldMapping::placeholder(),
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::MappingFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::MappingFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_id("RICE Score", &self.score_field_id)?;
        self.reach.validate("Reach")?;
        self.impact.validate("Impact")?;
        self.confidence.validate("Confidence")?;
        self.effort.validate("Effort")?;
        Ok(())
    }
}

fn check_id(name: &'static str, id: &str) -> Result<(), ConfigError> {
    if id.trim().is_empty() || id == PLACEHOLDER_ID {
        return Err(ConfigError::PlaceholderId(name));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn mapping(field_id: &str, items: &[(&str, f64)]) -> FieldMapping {
    FieldMapping {
        custom_field_id: field_id.into(),
        items: items
            .iter()
            .map(|(id, value)| FieldItem {
                id: (*id).into(),
                value: *value,
            })
            .collect(),
    }
}

#[cfg(test)]
pub(crate) fn sample_mappings() -> FieldMappings {
    let weights = |prefix: &str| -> Vec<(String, f64)> {
        OPTION_WEIGHTS
            .iter()
            .map(|w| (format!("{prefix}-{w}"), *w))
            .collect()
    };
    let build = |field: &str| {
        let items = weights(field);
        let refs: Vec<(&str, f64)> = items.iter().map(|(id, w)| (id.as_str(), *w)).collect();
        mapping(field, &refs)
    };
    FieldMappings {
        score_field_id: "score".into(),
        reach: build("reach"),
        impact: build("impact"),
        confidence: build("confidence"),
        effort: build("effort"),
    }
}
