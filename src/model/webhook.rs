use serde::{Deserialize, Serialize};

use super::card::Card;
use super::null_as_default;

/// Action tag on a Favro card webhook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    Created,
    Committed,
    Updated,
    Moved,
    Deleted,
    Archived,
    Unarchived,
    #[default]
    #[serde(other)]
    Unknown,
}

impl WebhookAction {
    /// Actions that can change the inputs of the score.
    pub fn triggers_recompute(self) -> bool {
        matches!(
            self,
            WebhookAction::Committed | WebhookAction::Updated | WebhookAction::Moved
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: WebhookAction,
    #[serde(default)]
    pub card: Option<Card>,
}
