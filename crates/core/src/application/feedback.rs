// Feedback Service - post-visit reviews

use crate::application::retry::{with_timeout, RetryPolicy};
use crate::domain::{DestinationId, Feedback, Rating, RequesterId};
use crate::error::{AppError, Result};
use crate::port::{DestinationRepository, FeedbackRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct FeedbackService {
    destinations: Arc<dyn DestinationRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    time_provider: Arc<dyn TimeProvider>,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl FeedbackService {
    pub fn new(
        destinations: Arc<dyn DestinationRepository>,
        feedback: Arc<dyn FeedbackRepository>,
        time_provider: Arc<dyn TimeProvider>,
        retry: RetryPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            destinations,
            feedback,
            time_provider,
            retry,
            store_timeout,
        }
    }

    /// Record a rating and comment for a destination
    pub async fn submit(
        &self,
        destination: &DestinationId,
        requester: &RequesterId,
        rating: i64,
        comment: &str,
    ) -> Result<Feedback> {
        let rating = Rating::new(rating)?;
        let feedback = Feedback::new(
            destination.clone(),
            requester.clone(),
            rating,
            comment,
            self.time_provider.now_millis(),
        )?;

        let known = with_timeout(
            self.store_timeout,
            "get_destination",
            self.destinations.get(destination),
        )
        .await?;
        if known.is_none() {
            return Err(AppError::UnknownDestination(destination.to_string()));
        }

        with_timeout(
            self.store_timeout,
            "submit_feedback",
            self.feedback.insert(&feedback),
        )
        .await?;

        info!(
            destination = %destination,
            requester = %requester,
            rating = rating.stars(),
            "Feedback submitted"
        );
        Ok(feedback)
    }

    /// Most recent feedback first
    pub async fn list(&self, destination: &DestinationId, limit: usize) -> Result<Vec<Feedback>> {
        self.retry
            .run_keyed("list_feedback", destination.as_str(), || {
                with_timeout(
                    self.store_timeout,
                    "list_feedback",
                    self.feedback.list_for_destination(destination, limit),
                )
            })
            .await
    }
}
