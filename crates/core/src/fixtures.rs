//! Canned Swarm responses for exercising handlers without a backend.
//!
//! `FixtureReviewSource` answers from in-memory records (or JSON bodies captured from a
//! real Swarm instance) and records every call so tests can assert which lookups a flow made.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::review::{Review, ReviewEnvelope, ReviewId, ReviewsData};
use crate::domain::review_type::ReviewType;
use crate::domain::user::User;
use crate::errors::SwarmError;
use crate::source::ReviewSource;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceCall {
    Review(ReviewId),
    ReviewList { review_type: ReviewType, actor: String },
    User(String),
}

#[derive(Debug, Default)]
pub struct FixtureReviewSource {
    reviews: HashMap<ReviewId, Review>,
    lists: HashMap<ReviewType, ReviewsData>,
    users: HashMap<String, User>,
    failure: Option<SwarmError>,
    calls: Mutex<Vec<SourceCall>>,
}

impl FixtureReviewSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_review(mut self, review: Review) -> Self {
        self.reviews.insert(review.id, review);
        self
    }

    pub fn with_review_list(mut self, review_type: ReviewType, data: ReviewsData) -> Self {
        self.lists.insert(review_type.effective(), data);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        let key = user.username.clone().unwrap_or_default();
        self.users.insert(key, user);
        self
    }

    /// Every call fails with `error`, as if the backend were unreachable.
    pub fn failing_with(mut self, error: SwarmError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Loads a `GET /reviews/{id}` response body.
    pub fn with_review_json(self, body: &str) -> Result<Self, serde_json::Error> {
        let envelope: ReviewEnvelope = serde_json::from_str(body)?;
        Ok(match envelope.review {
            Some(review) => self.with_review(review),
            None => self,
        })
    }

    /// Loads a `GET /reviews?...` response body.
    pub fn with_review_list_json(
        self,
        review_type: ReviewType,
        body: &str,
    ) -> Result<Self, serde_json::Error> {
        let data: ReviewsData = serde_json::from_str(body)?;
        Ok(self.with_review_list(review_type, data))
    }

    /// Loads a `GET /users?users=...` response body; every listed user is registered.
    pub fn with_users_json(self, body: &str) -> Result<Self, serde_json::Error> {
        let users: Vec<User> = serde_json::from_str(body)?;
        Ok(users.into_iter().fold(self, Self::with_user))
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: SourceCall) -> Result<(), SwarmError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReviewSource for FixtureReviewSource {
    async fn fetch_review(&self, id: ReviewId) -> Result<Review, SwarmError> {
        self.record(SourceCall::Review(id))?;
        self.reviews.get(&id).cloned().ok_or_else(|| SwarmError::not_found(format!("review {id}")))
    }

    async fn fetch_review_list(
        &self,
        review_type: ReviewType,
        actor: &str,
    ) -> Result<ReviewsData, SwarmError> {
        self.record(SourceCall::ReviewList { review_type, actor: actor.to_owned() })?;
        self.lists
            .get(&review_type.effective())
            .cloned()
            .ok_or_else(|| SwarmError::not_found(format!("{review_type} reviews for {actor}")))
    }

    async fn fetch_user(&self, username: &str) -> Result<User, SwarmError> {
        self.record(SourceCall::User(username.to_owned()))?;
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| SwarmError::not_found(format!("user {username}")))
    }
}
