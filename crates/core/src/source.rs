use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::review::{Review, ReviewId, ReviewsData};
use crate::domain::review_type::ReviewType;
use crate::domain::user::User;
use crate::errors::SwarmError;

/// Read access to the review-tracking backend.
///
/// Each call is a single request. Implementations must be safe to share across concurrent
/// event handlers and must bound every call with a timeout.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_review(&self, id: ReviewId) -> Result<Review, SwarmError>;

    /// Latest reviews the actor authored or participates in, depending on `review_type`.
    async fn fetch_review_list(
        &self,
        review_type: ReviewType,
        actor: &str,
    ) -> Result<ReviewsData, SwarmError>;

    async fn fetch_user(&self, username: &str) -> Result<User, SwarmError>;
}

#[async_trait]
impl<S> ReviewSource for Arc<S>
where
    S: ReviewSource + ?Sized,
{
    async fn fetch_review(&self, id: ReviewId) -> Result<Review, SwarmError> {
        (**self).fetch_review(id).await
    }

    async fn fetch_review_list(
        &self,
        review_type: ReviewType,
        actor: &str,
    ) -> Result<ReviewsData, SwarmError> {
        (**self).fetch_review_list(review_type, actor).await
    }

    async fn fetch_user(&self, username: &str) -> Result<User, SwarmError> {
        (**self).fetch_user(username).await
    }
}
