//! Helix Swarm REST client (API v9).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use swarmbot_core::config::SwarmConfig;
use swarmbot_core::{
    Review, ReviewEnvelope, ReviewId, ReviewSource, ReviewType, ReviewsData, SwarmError, User,
};
use tracing::debug;

/// One shared `reqwest::Client`; every request uses Basic auth and the configured timeout.
#[derive(Clone, Debug)]
pub struct SwarmClient {
    client: Client,
    api_url: String,
    username: String,
    password: SecretString,
    max_results: u32,
}

impl SwarmClient {
    pub fn new(config: &SwarmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            api_url: config.api_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_results: config.max_results,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// GETs `path` and decodes the body.
    ///
    /// 4xx and empty 2xx bodies are `NotFound`; transport errors, 5xx and undecodable
    /// bodies are `Upstream`.
    async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, SwarmError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .query(query)
            .send()
            .await
            .map_err(|error| {
                let kind = if error.is_timeout() { "timed out" } else { "failed" };
                SwarmError::Upstream(format!("request for {resource} {kind}: {error}"))
            })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), resource, "swarm response received");

        if status.is_client_error() {
            return Err(SwarmError::not_found(resource));
        }
        if !status.is_success() {
            return Err(SwarmError::Upstream(format!("swarm returned {status} for {resource}")));
        }

        let body = response.text().await.map_err(|error| {
            SwarmError::Upstream(format!("could not read {resource} response: {error}"))
        })?;
        if body.trim().is_empty() || status == StatusCode::NO_CONTENT {
            return Err(SwarmError::not_found(resource));
        }

        serde_json::from_str(&body).map_err(|error| {
            SwarmError::Upstream(format!("could not decode {resource} response: {error}"))
        })
    }
}

#[async_trait]
impl ReviewSource for SwarmClient {
    async fn fetch_review(&self, id: ReviewId) -> Result<Review, SwarmError> {
        let resource = format!("review {id}");
        let envelope: ReviewEnvelope =
            self.get_json(&format!("/reviews/{id}"), &[], &resource).await?;
        envelope.review.ok_or_else(|| SwarmError::not_found(resource))
    }

    async fn fetch_review_list(
        &self,
        review_type: ReviewType,
        actor: &str,
    ) -> Result<ReviewsData, SwarmError> {
        let review_type = review_type.effective();
        let query = [
            ("max", self.max_results.to_string()),
            (review_type.query_parameter(), actor.to_owned()),
        ];
        self.get_json("/reviews", &query, &format!("{review_type} reviews for {actor}")).await
    }

    async fn fetch_user(&self, username: &str) -> Result<User, SwarmError> {
        let resource = format!("user {username}");
        let users: Vec<User> =
            self.get_json("/users", &[("users", username.to_owned())], &resource).await?;
        users.into_iter().next().ok_or_else(|| SwarmError::not_found(resource))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::{
        extract::{Path, Query},
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::get,
        Router,
    };
    use swarmbot_core::config::SwarmConfig;
    use swarmbot_core::{ReviewId, ReviewSource, ReviewType, SwarmError};
    use tokio::net::TcpListener;

    use super::SwarmClient;

    const EXPECTED_AUTH: &str = "Basic Ym90OnNlY3JldA==";

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) == Some(EXPECTED_AUTH)
    }

    async fn review(Path(id): Path<u64>, headers: HeaderMap) -> (StatusCode, String) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, r#"{"error": "Unauthorized"}"#.to_owned());
        }
        match id {
            12345 => (
                StatusCode::OK,
                r#"{"review": {"id": 12345, "state": "needsReview", "author": "jdoe",
                    "participants": [], "commitStatus": [], "created": 1700000000000}}"#
                    .to_owned(),
            ),
            500 => (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_owned()),
            600 => (StatusCode::OK, String::new()),
            700 => (StatusCode::OK, "<html>login</html>".to_owned()),
            800 => (StatusCode::OK, "{}".to_owned()),
            900 => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                (StatusCode::OK, "{}".to_owned())
            }
            _ => (StatusCode::NOT_FOUND, r#"{"error": "Not Found"}"#.to_owned()),
        }
    }

    async fn review_list(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        if params.get("max").map(String::as_str) != Some("5") {
            return (StatusCode::BAD_REQUEST, String::new());
        }
        if params.get("author").map(String::as_str) == Some("bot") {
            return (
                StatusCode::OK,
                r#"{"lastSeen": 12340, "totalCount": 2, "reviews": [
                    {"id": 12345, "state": "needsReview"}, {"id": 12340, "state": "approved"}]}"#
                    .to_owned(),
            );
        }
        if params.get("participants").map(String::as_str) == Some("bot") {
            return (StatusCode::OK, r#"{"reviews": []}"#.to_owned());
        }
        (StatusCode::BAD_REQUEST, String::new())
    }

    async fn users(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        match params.get("users").map(String::as_str) {
            Some("jdoe") => (
                StatusCode::OK,
                r#"[{"User": "jdoe", "Email": "jdoe@example.com", "FullName": "Jane Doe"}]"#
                    .to_owned(),
            ),
            _ => (StatusCode::OK, "[]".to_owned()),
        }
    }

    async fn spawn_fake_swarm() -> String {
        let app = Router::new()
            .route("/api/v9/reviews/{id}", get(review))
            .route("/api/v9/reviews", get(review_list))
            .route("/api/v9/users", get(users));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake swarm");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake swarm server");
        });
        format!("http://{address}")
    }

    async fn client_with_password(password: &str) -> SwarmClient {
        SwarmClient::new(&SwarmConfig {
            base_url: spawn_fake_swarm().await,
            username: "bot".to_owned(),
            password: password.to_owned().into(),
            timeout_secs: 1,
            max_results: 5,
        })
        .expect("client")
    }

    async fn client() -> SwarmClient {
        client_with_password("secret").await
    }

    #[tokio::test]
    async fn fetches_review_from_envelope() {
        let review = client().await.fetch_review(ReviewId(12345)).await.expect("review");

        assert_eq!(review.id, ReviewId(12345));
        assert_eq!(review.author.as_deref(), Some("jdoe"));
        assert!(review.participants.is_empty());
        assert_eq!(review.commit_status, None);
    }

    #[tokio::test]
    async fn client_errors_and_empty_bodies_are_not_found() {
        let client = client().await;

        for id in [404, 600, 800] {
            let error = client.fetch_review(ReviewId(id)).await.expect_err("not found");
            assert!(error.is_not_found(), "review {id}: {error}");
        }
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_found() {
        let error = client_with_password("wrong")
            .await
            .fetch_review(ReviewId(12345))
            .await
            .expect_err("unauthorized");
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn server_errors_and_garbage_are_upstream_failures() {
        let client = client().await;

        for id in [500, 700] {
            let error = client.fetch_review(ReviewId(id)).await.expect_err("upstream");
            assert!(matches!(error, SwarmError::Upstream(_)), "review {id}: {error}");
        }
    }

    #[tokio::test]
    async fn slow_backend_times_out_as_upstream_failure() {
        let error = client().await.fetch_review(ReviewId(900)).await.expect_err("timeout");
        assert!(matches!(error, SwarmError::Upstream(ref message) if message.contains("timed out")));
    }

    #[tokio::test]
    async fn lists_reviews_by_author_and_participant() {
        let client = client().await;

        let authored = client.fetch_review_list(ReviewType::Author, "bot").await.expect("author");
        assert_eq!(authored.total_count, Some(2));
        assert_eq!(authored.last_seen, Some(12340));
        assert_eq!(
            authored.reviews.iter().map(|review| review.id).collect::<Vec<_>>(),
            vec![ReviewId(12345), ReviewId(12340)]
        );

        let participating =
            client.fetch_review_list(ReviewType::Participant, "bot").await.expect("participant");
        assert!(participating.is_empty());

        let undefined = client.fetch_review_list(ReviewType::Undefined, "bot").await.expect("undefined");
        assert_eq!(undefined, authored);
    }

    #[tokio::test]
    async fn fetches_first_matching_user() {
        let client = client().await;

        let user = client.fetch_user("jdoe").await.expect("user");
        assert_eq!(user.username.as_deref(), Some("jdoe"));
        assert_eq!(user.full_name.as_deref(), Some("Jane Doe"));

        let error = client.fetch_user("ghost").await.expect_err("missing user");
        assert!(error.is_not_found());
    }
}
