// SQLite FeedbackRepository Implementation

use crate::connection::WriteLock;
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitline_core::domain::{DestinationId, Feedback, Rating, RequesterId};
use waitline_core::error::{AppError, Result};
use waitline_core::port::FeedbackRepository;

pub struct SqliteFeedbackRepository {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl SqliteFeedbackRepository {
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        Self { pool, write_lock }
    }
}

#[async_trait]
impl FeedbackRepository for SqliteFeedbackRepository {
    async fn insert(&self, feedback: &Feedback) -> Result<()> {
        let _guard = self.write_lock.acquire().await;

        sqlx::query(
            r#"
            INSERT INTO feedback (destination_id, requester_id, rating, comment, submitted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(feedback.destination.as_str())
        .bind(feedback.requester.as_str())
        .bind(i64::from(feedback.rating))
        .bind(&feedback.comment)
        .bind(feedback.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_for_destination(
        &self,
        destination: &DestinationId,
        limit: usize,
    ) -> Result<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT destination_id, requester_id, rating, comment, submitted_at
            FROM feedback
            WHERE destination_id = ?
            ORDER BY submitted_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(destination.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(FeedbackRow::into_feedback).collect()
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct FeedbackRow {
    destination_id: String,
    requester_id: String,
    rating: i64,
    comment: String,
    submitted_at: i64,
}

impl FeedbackRow {
    fn into_feedback(self) -> Result<Feedback> {
        let rating = Rating::new(self.rating)
            .map_err(|e| AppError::Database(format!("Corrupt feedback rating: {}", e)))?;

        Ok(Feedback {
            destination: DestinationId::from_name(&self.destination_id),
            requester: RequesterId::new(self.requester_id),
            rating,
            comment: self.comment,
            submitted_at: self.submitted_at,
        })
    }
}
