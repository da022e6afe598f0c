//! HTTP surface for Favro webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::calculator::Calculator;
use crate::model::webhook::WebhookEvent;
use crate::signature::{WebhookVerifier, CALCULATOR_PATH};

pub const SIGNATURE_HEADER: &str = "X-Favro-Webhook";

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<WebhookVerifier>,
    pub calculator: Calculator,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(CALCULATOR_PATH, post(calculator_webhook))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Acknowledges the delivery and hands verified events to a background task.
///
/// The status is decided by the signature alone; the caller never sees the outcome
/// of the score update.
async fn calculator_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            warn!("Rejected webhook with unreadable body");
            return StatusCode::FORBIDDEN;
        }
    };

    let payload_id = payload["payloadId"].as_str().unwrap_or_default();
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !state.verifier.verify(payload_id, signature) {
        warn!("Rejected webhook with invalid signature");
        return StatusCode::FORBIDDEN;
    }

    // Verified deliveries are acknowledged even when the card is not in a shape we read.
    let event: WebhookEvent = match serde_json::from_value(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(category = ?e.classify(), "Verified webhook has an unexpected payload shape");
            return StatusCode::OK;
        }
    };

    debug!(payload_id = %event.payload_id, action = ?event.action, "Webhook accepted");
    let calculator = state.calculator.clone();
    tokio::spawn(async move {
        calculator.handle(event).await.log();
    });

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::calculator::tests::{event, test_config};
    use crate::providers::tests::MockPublisher;

    struct Harness {
        router: Router,
        verifier: Arc<WebhookVerifier>,
        updates: Arc<Mutex<Vec<(String, f64)>>>,
        calls: Arc<Mutex<u32>>,
    }

    fn harness() -> Harness {
        let config = Arc::new(test_config());
        let verifier = Arc::new(WebhookVerifier::new(
            &config.webhook_secret,
            &config.webhook_url,
        ));
        let publisher = MockPublisher::new();
        let updates = publisher.updates.clone();
        let calls = publisher.calls.clone();
        let state = AppState {
            verifier: verifier.clone(),
            calculator: Calculator::new(config, Arc::new(publisher)),
        };
        Harness {
            router: build_router(state),
            verifier,
            updates,
            calls,
        }
    }

    fn post_webhook(body: String, signature: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri("/calculator")
            .header("Content-Type", "application/json");
        if let Some(sig) = signature {
            req = req.header(SIGNATURE_HEADER, sig);
        }
        req.body(Body::from(body)).unwrap()
    }

    /// Lets the spawned processing task run to completion. With the clock paused the
    /// sleep only elapses once every other task is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn valid_update_returns_ok_and_publishes() {
        let h = harness();
        let body = serde_json::to_string(&event("updated", None)).unwrap();
        let sig = h.verifier.sign("payload-1").unwrap();

        let resp = h.router.oneshot(post_webhook(body, Some(&sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        settle().await;
        assert_eq!(
            h.updates.lock().unwrap().as_slice(),
            &[("card-1".to_string(), 5.0 * 8.0 * 10.0 / 3.0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_score_returns_ok_without_publishing() {
        let h = harness();
        let body = serde_json::to_string(&event("updated", Some(5.0 * 8.0 * 10.0 / 3.0))).unwrap();
        let sig = h.verifier.sign("payload-1").unwrap();

        let resp = h.router.oneshot(post_webhook(body, Some(&sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        settle().await;
        assert_eq!(*h.calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn irrelevant_action_returns_ok_without_computing() {
        let h = harness();
        let body = serde_json::to_string(&event("archived", None)).unwrap();
        let sig = h.verifier.sign("payload-1").unwrap();

        let resp = h.router.oneshot(post_webhook(body, Some(&sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        settle().await;
        assert_eq!(*h.calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_signature_is_forbidden() {
        let h = harness();
        let body = serde_json::to_string(&event("updated", None)).unwrap();

        let resp = h
            .router
            .oneshot(post_webhook(body, Some("bm90IGEgc2lnbmF0dXJl")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        settle().await;
        assert_eq!(*h.calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_signature_is_forbidden() {
        let h = harness();
        let body = serde_json::to_string(&event("moved", None)).unwrap();

        let resp = h.router.oneshot(post_webhook(body, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        settle().await;
        assert_eq!(*h.calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_event_with_unexpected_card_shape_is_acknowledged() {
        let bodies = [
            r#"{"payloadId":"payload-1","action":"archived","card":{"cardId":"c1","customFields":null}}"#,
            r#"{"payloadId":"payload-1","action":"archived","card":{"cardId":null,"customFields":[]}}"#,
            r#"{"payloadId":"payload-1","action":"archived","card":{"cardId":"c1","customFields":[{"value":["x"]}]}}"#,
            r#"{"payloadId":"payload-1","action":null}"#,
            r#"{"payloadId":"payload-1","action":"updated","card":{"cardId":"c1","customFields":"oops"}}"#,
            r#"{"payloadId":"payload-1","action":7}"#,
        ];
        for body in bodies {
            let h = harness();
            let sig = h.verifier.sign("payload-1").unwrap();
            let resp = h
                .router
                .oneshot(post_webhook(body.to_string(), Some(&sig)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{body}");

            settle().await;
            assert_eq!(*h.calls.lock().unwrap(), 0, "{body}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unsigned_event_with_unexpected_card_shape_is_forbidden() {
        let h = harness();
        let body = r#"{"payloadId":"payload-1","action":"archived","card":{"customFields":null}}"#;
        let resp = h
            .router
            .oneshot(post_webhook(body.to_string(), Some("bm90IGEgc2lnbmF0dXJl")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_body_is_forbidden() {
        let h = harness();
        let sig = h.verifier.sign("payload-1").unwrap();
        let resp = h
            .router
            .oneshot(post_webhook("not json".into(), Some(&sig)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test(start_paused = true)]
    async fn health_check_reports_healthy() {
        let h = harness();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = h.router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
