// Feedback Repository Port

use crate::domain::{DestinationId, Feedback};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn insert(&self, feedback: &Feedback) -> Result<()>;

    /// Newest first
    async fn list_for_destination(
        &self,
        destination: &DestinationId,
        limit: usize,
    ) -> Result<Vec<Feedback>>;
}
