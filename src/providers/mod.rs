pub mod favro;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::RetryPolicy;

/// Writes a computed score back onto a remote card.
#[async_trait]
pub trait ScorePublisher: Send + Sync {
    fn name(&self) -> &str;
    async fn update_score(&self, card_id: &str, score: f64) -> Result<()>;
}

/// Publishes `score` under `policy`. Failures are logged and swallowed.
///
/// Returns whether a write succeeded.
pub async fn publish_score(
    publisher: &dyn ScorePublisher,
    policy: &RetryPolicy,
    card_id: &str,
    score: f64,
) -> bool {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let call = publisher.update_score(card_id, score);
        let result = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("timed out after {limit:?}")),
            },
            None => call.await,
        };

        match result {
            Ok(()) => {
                info!(card_id, score, provider = publisher.name(), "RICE score updated");
                return true;
            }
            Err(e) => {
                error!(
                    card_id,
                    attempt,
                    attempts,
                    provider = publisher.name(),
                    error = %e,
                    "Failed to update RICE score"
                );
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }
    warn!(card_id, "Giving up on RICE score update");
    false
}
