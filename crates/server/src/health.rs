use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

#[derive(Clone, Debug)]
pub struct HealthState {
    pub swarm_api_url: String,
    pub slack_transport: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub swarm: HealthCheck,
    pub slack: HealthCheck,
    pub checked_at: String,
}

/// `/health` plus the Events API request URL, which only has to answer URL verification
/// while events arrive over Socket Mode.
pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(events))
        .with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "swarmbot-server runtime initialized".to_string(),
        },
        swarm: HealthCheck { status: "configured", detail: state.swarm_api_url },
        slack: HealthCheck {
            status: "configured",
            detail: format!("{} socket mode transport", state.slack_transport),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

pub async fn events(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = body.get("challenge").cloned().unwrap_or(Value::Null);
        info!(event_name = "ingress.slack.url_verification", "answered events url verification");
        return (StatusCode::OK, Json(json!({ "challenge": challenge })));
    }

    let event_type = body.get("type").and_then(Value::as_str).unwrap_or("unknown");
    debug!(
        event_name = "ingress.slack.http_event_ignored",
        event_type,
        "events arrive over socket mode; http callback acknowledged only"
    );
    (StatusCode::OK, Json(json!({})))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    fn state() -> HealthState {
        HealthState {
            swarm_api_url: "https://swarm.example.com/api/v9".to_owned(),
            slack_transport: "noop",
        }
    }

    #[tokio::test]
    async fn health_reports_ready_with_configured_backends() {
        let (status, Json(payload)) = health(State(state())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.swarm.detail, "https://swarm.example.com/api/v9");
        assert_eq!(payload.slack.detail, "noop socket mode transport");
    }

    #[tokio::test]
    async fn events_endpoint_echoes_url_verification_challenge() {
        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"type": "url_verification", "token": "t", "challenge": "abc123"}).to_string(),
            ))
            .expect("request");

        let response = router(state()).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value, json!({"challenge": "abc123"}));
    }

    #[tokio::test]
    async fn events_endpoint_acknowledges_other_callbacks() {
        let request = Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(json!({"type": "event_callback"}).to_string()))
            .expect("request");

        let response = router(state()).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
