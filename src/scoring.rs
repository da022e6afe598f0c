use thiserror::Error;

use crate::model::card::Card;
use crate::model::fields::{FieldMapping, FieldMappings};

/// Resolved value of an input that has no usable selection.
pub const UNSET: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingInput {
    #[error("Reach is not set")]
    Reach,
    #[error("Impact is not set")]
    Impact,
    #[error("Confidence is not set")]
    Confidence,
    #[error("Effort is not set")]
    Effort,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiceInputs {
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
}

impl RiceInputs {
    /// Resolves all four inputs, stopping at the first one that is unset.
    pub fn from_card(card: &Card, fields: &FieldMappings) -> Result<Self, MissingInput> {
        let input = |mapping: &FieldMapping, missing: MissingInput| {
            let value = resolve_value(card, mapping, UNSET);
            if value == UNSET {
                Err(missing)
            } else {
                Ok(value)
            }
        };
        Ok(Self {
            reach: input(&fields.reach, MissingInput::Reach)?,
            impact: input(&fields.impact, MissingInput::Impact)?,
            confidence: input(&fields.confidence, MissingInput::Confidence)?,
            effort: input(&fields.effort, MissingInput::Effort)?,
        })
    }

    pub fn score(&self) -> f64 {
        compute_score(self.reach, self.impact, self.confidence, self.effort)
    }
}

/// Weight of the option selected on `card` for `mapping`, or `default`.
///
/// Only the first selected option counts. An option id missing from the mapping
/// (stale or misconfigured) also yields `default`.
pub fn resolve_value(card: &Card, mapping: &FieldMapping, default: f64) -> f64 {
    card.field(&mapping.custom_field_id)
        .and_then(|field| field.first_selected())
        .and_then(|item_id| mapping.weight_of(item_id))
        .unwrap_or(default)
}

/// RICE score. Callers guarantee `effort != 0`.
pub fn compute_score(reach: f64, impact: f64, confidence: f64, effort: f64) -> f64 {
    reach * impact * confidence / effort
}

/// Whether `new_score` differs from the score stored on `card`.
///
/// A card without a stored score always counts as changed, even for a new score of 0.
/// Writing only on change is what stops our own update webhooks from looping.
pub fn has_changed(card: &Card, score_field_id: &str, new_score: f64) -> bool {
    match card.field(score_field_id).and_then(|field| field.total) {
        Some(stored) => stored != new_score,
        None => true,
    }
}
