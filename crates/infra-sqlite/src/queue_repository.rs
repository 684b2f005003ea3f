// SQLite QueueRepository Implementation

use crate::connection::WriteLock;
use crate::error::map_sqlx_error;
use crate::SqliteQueueTransaction;
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitline_core::domain::{DestinationId, PartySize, QueueMembership, RequesterId};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{QueueRepository, QueueTransaction, TransactionalQueueRepository};

pub(crate) const MEMBERSHIP_COLUMNS: &str =
    "destination_id, requester_id, party_size, sequence, joined_at";

pub struct SqliteQueueRepository {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        Self { pool, write_lock }
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn snapshot(&self, destination: &DestinationId) -> Result<Vec<QueueMembership>> {
        // Single statement, so the result is one consistent read
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE destination_id = ? ORDER BY sequence ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(destination.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(MembershipRow::into_membership).collect()
    }

    async fn active_destinations(&self) -> Result<Vec<DestinationId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT destination_id FROM memberships ORDER BY 1")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(ids.iter().map(|id| DestinationId::from_name(id)).collect())
    }
}

#[async_trait]
impl TransactionalQueueRepository for SqliteQueueRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
        let guard = self.write_lock.acquire().await;
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(tx, guard)))
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MembershipRow {
    destination_id: String,
    requester_id: String,
    party_size: i64,
    sequence: i64,
    joined_at: i64,
}

impl MembershipRow {
    pub(crate) fn into_membership(self) -> Result<QueueMembership> {
        let party_size = PartySize::new(self.party_size).map_err(|e| {
            AppError::Database(format!(
                "Corrupt membership {}/{}: {}",
                self.destination_id, self.requester_id, e
            ))
        })?;

        Ok(QueueMembership::new(
            DestinationId::from_name(&self.destination_id),
            RequesterId::new(self.requester_id),
            party_size,
            self.sequence,
            self.joined_at,
        ))
    }
}
