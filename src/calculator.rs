use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::model::webhook::{WebhookAction, WebhookEvent};
use crate::providers::{publish_score, ScorePublisher};
use crate::scoring::{has_changed, MissingInput, RiceInputs};

/// Terminal state of a verified webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Action does not affect the score.
    Ignored(WebhookAction),
    /// Relevant action but the payload had no card.
    NoCard,
    Aborted(MissingInput),
    /// Stored score already matches.
    Unchanged(f64),
    /// A write was issued. `delivered` is false when every attempt failed.
    Published { score: f64, delivered: bool },
}

impl Outcome {
    /// One line per processed event. Card-level detail is logged while handling.
    pub fn log(&self) {
        match self {
            Outcome::Ignored(action) => debug!(?action, "Event ignored"),
            Outcome::NoCard => debug!("Event dropped without card"),
            Outcome::Aborted(missing) => debug!(%missing, "Score computation aborted"),
            Outcome::Unchanged(score) => debug!(score, "Score update skipped"),
            Outcome::Published {
                score,
                delivered: true,
            } => debug!(score, "Score published"),
            Outcome::Published {
                score,
                delivered: false,
            } => warn!(score, "Score computed but not delivered"),
        }
    }
}

#[derive(Clone)]
pub struct Calculator {
    config: Arc<AppConfig>,
    publisher: Arc<dyn ScorePublisher>,
}

impl Calculator {
    pub fn new(config: Arc<AppConfig>, publisher: Arc<dyn ScorePublisher>) -> Self {
        Self { config, publisher }
    }

    /// Recomputes and writes back the score for an already verified event.
    pub async fn handle(&self, event: WebhookEvent) -> Outcome {
        if !event.action.triggers_recompute() {
            debug!(action = ?event.action, "Ignoring webhook action");
            return Outcome::Ignored(event.action);
        }
        let Some(card) = event.card else {
            warn!(payload_id = %event.payload_id, "Webhook event carried no card");
            return Outcome::NoCard;
        };

        let fields = &self.config.fields;
        let inputs = match RiceInputs::from_card(&card, fields) {
            Ok(inputs) => inputs,
            Err(missing) => {
                warn!(card_id = %card.card_id, "{missing}");
                return Outcome::Aborted(missing);
            }
        };
        let score = inputs.score();

        // Our own write comes back as an "updated" webhook; stop here when nothing moved.
        if !has_changed(&card, &fields.score_field_id, score) {
            debug!(card_id = %card.card_id, score, "RICE score unchanged");
            return Outcome::Unchanged(score);
        }

        let delivered = publish_score(
            self.publisher.as_ref(),
            &self.config.publish,
            &card.card_id,
            score,
        )
        .await;
        Outcome::Published { score, delivered }
    }
}
