use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use swarmbot_core::config::SlackConfig;
use swarmbot_slack::blocks::View;
use swarmbot_slack::web_api::{SlackWebApi, ViewApiError};
use tracing::debug;

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// `views.*` calls against the Slack Web API with the bot token, bounded by
/// `slack.timeout_secs`.
#[derive(Clone, Debug)]
pub struct SlackWebClient {
    client: Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(config: &SlackConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
        })
    }

    async fn call(&self, method: &str, body: Value) -> Result<(), ViewApiError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.api_base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(method, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewApiError::Transport(format!("{method} returned {status}")));
        }

        let reply: ApiResponse =
            response.json().await.map_err(|error| transport_error(method, &error))?;
        debug!(method, ok = reply.ok, "slack web api call completed");

        if reply.ok {
            Ok(())
        } else {
            Err(ViewApiError::api(method, reply.error.unwrap_or_else(|| "unknown_error".to_owned())))
        }
    }
}

fn transport_error(method: &str, error: &reqwest::Error) -> ViewApiError {
    if error.is_timeout() {
        ViewApiError::Transport(format!("{method} timed out"))
    } else {
        ViewApiError::Transport(format!("{method}: {error}"))
    }
}

#[async_trait]
impl SlackWebApi for SlackWebClient {
    async fn open_view(&self, trigger_id: &str, view: &View) -> Result<(), ViewApiError> {
        self.call("views.open", json!({ "trigger_id": trigger_id, "view": view })).await
    }

    async fn update_view(&self, view_id: &str, view: &View) -> Result<(), ViewApiError> {
        self.call("views.update", json!({ "view_id": view_id, "view": view })).await
    }

    async fn publish_view(&self, user_id: &str, view: &View) -> Result<(), ViewApiError> {
        self.call("views.publish", json!({ "user_id": user_id, "view": view })).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{
        extract::{Path, State},
        http::{header::AUTHORIZATION, HeaderMap},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use swarmbot_core::config::SlackConfig;
    use swarmbot_slack::blocks::View;
    use swarmbot_slack::web_api::{SlackWebApi, ViewApiError};
    use tokio::net::TcpListener;

    use super::SlackWebClient;

    type Received = Arc<Mutex<Vec<(String, Value)>>>;

    async fn api_method(
        State(received): State<Received>,
        Path(method): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        if headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
            != Some("Bearer xoxb-test")
        {
            return Json(json!({"ok": false, "error": "invalid_auth"}));
        }
        received.lock().expect("lock").push((method.clone(), body.clone()));

        if body.get("trigger_id").and_then(Value::as_str) == Some("expired") {
            return Json(json!({"ok": false, "error": "expired_trigger_id"}));
        }
        Json(json!({"ok": true}))
    }

    async fn stalled_method(Path(_method): Path<String>) -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Json(json!({"ok": true}))
    }

    async fn spawn_fake_slack() -> (String, Received) {
        let received = Received::default();
        let app = Router::new()
            .route("/api/{method}", post(api_method))
            .route("/stalled/{method}", post(stalled_method))
            .with_state(received.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake slack");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake slack server");
        });
        (format!("http://{address}"), received)
    }

    fn client(api_base_url: String, bot_token: &str) -> SlackWebClient {
        SlackWebClient::new(&SlackConfig {
            app_token: "xapp-test".to_owned().into(),
            bot_token: bot_token.to_owned().into(),
            api_base_url,
            timeout_secs: 1,
        })
        .expect("client")
    }

    #[tokio::test]
    async fn posts_views_with_bearer_token() {
        let (base_url, received) = spawn_fake_slack().await;
        let client = client(format!("{base_url}/api"), "xoxb-test");
        let view = View::home(Vec::new());

        client.publish_view("U1", &view).await.expect("publish");
        client.update_view("V1", &view).await.expect("update");

        let received = received.lock().expect("lock").clone();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].0, "views.publish");
        assert_eq!(received[0].1["user_id"], "U1");
        assert_eq!(received[0].1["view"]["type"], "home");
        assert_eq!(received[1].0, "views.update");
        assert_eq!(received[1].1["view_id"], "V1");
    }

    #[tokio::test]
    async fn api_errors_carry_the_slack_error_string() {
        let (base_url, _) = spawn_fake_slack().await;

        let error = client(format!("{base_url}/api"), "xoxb-test")
            .open_view("expired", &View::modal("review-details", "Review Details", Vec::new()))
            .await
            .expect_err("expired trigger");
        assert_eq!(error, ViewApiError::api("views.open", "expired_trigger_id"));

        let error = client(format!("{base_url}/api"), "xoxb-other")
            .publish_view("U1", &View::home(Vec::new()))
            .await
            .expect_err("bad token");
        assert_eq!(error.reason(), "invalid_auth");
    }

    #[tokio::test]
    async fn stalled_api_call_times_out() {
        let (base_url, _) = spawn_fake_slack().await;
        let client = client(format!("{base_url}/stalled"), "xoxb-test");

        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            client.publish_view("U1", &View::home(Vec::new())),
        )
        .await
        .expect("client timeout should fire before the guard");

        assert_eq!(outcome, Err(ViewApiError::Transport("views.publish timed out".to_owned())));
    }

    #[tokio::test]
    async fn unreachable_api_is_a_transport_error() {
        let error = client("http://127.0.0.1:9/api".to_owned(), "xoxb-test")
            .publish_view("U1", &View::home(Vec::new()))
            .await
            .expect_err("unreachable");
        assert!(matches!(error, ViewApiError::Transport(_)));
    }
}
