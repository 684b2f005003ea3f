// SQLite Transaction Implementation

use crate::destination_repository::{to_i64, DestinationRow, DESTINATION_COLUMNS};
use crate::error::{is_unique_violation, map_sqlx_error};
use crate::queue_repository::{MembershipRow, MEMBERSHIP_COLUMNS};
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use tokio::sync::OwnedMutexGuard;
use waitline_core::domain::{
    Destination, DestinationId, QueueMembership, RequesterId, SequenceNumber,
};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{QueueTransaction, Transaction};

/// Queue transaction holding the process writer lock until it ends
pub struct SqliteQueueTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    _write_guard: OwnedMutexGuard<()>,
}

impl SqliteQueueTransaction {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>, write_guard: OwnedMutexGuard<()>) -> Self {
        Self {
            tx,
            _write_guard: write_guard,
        }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueueTransaction for SqliteQueueTransaction {
    async fn get_destination(&mut self, id: &DestinationId) -> Result<Option<Destination>> {
        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            "SELECT {} FROM destinations WHERE id = ?",
            DESTINATION_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DestinationRow::into_destination).transpose()
    }

    async fn claim_next_sequence(&mut self, id: &DestinationId) -> Result<Option<SequenceNumber>> {
        sqlx::query_scalar(
            "UPDATE destinations SET last_sequence = last_sequence + 1 WHERE id = ? RETURNING last_sequence",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_membership(
        &mut self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<Option<QueueMembership>> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE destination_id = ? AND requester_id = ?",
            MEMBERSHIP_COLUMNS
        ))
        .bind(destination.as_str())
        .bind(requester.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(MembershipRow::into_membership).transpose()
    }

    async fn insert_membership(&mut self, membership: &QueueMembership) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memberships (destination_id, requester_id, party_size, sequence, joined_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(membership.destination.as_str())
        .bind(membership.requester.as_str())
        .bind(i64::from(membership.party_size))
        .bind(membership.sequence)
        .bind(membership.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::already_queued(&membership.destination, &membership.requester)
            } else {
                map_sqlx_error(e)
            }
        })?;

        Ok(())
    }

    async fn delete_membership(
        &mut self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM memberships WHERE destination_id = ? AND requester_id = ?")
                .bind(destination.as_str())
                .bind(requester.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn memberships(&mut self, destination: &DestinationId) -> Result<Vec<QueueMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {} FROM memberships WHERE destination_id = ? ORDER BY sequence ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(destination.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(MembershipRow::into_membership).collect()
    }

    async fn add_to_day_count(&mut self, destination: &DestinationId, people: u64) -> Result<()> {
        let result = sqlx::query("UPDATE destinations SET day_count = day_count + ? WHERE id = ?")
            .bind(to_i64(people))
            .bind(destination.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::UnknownDestination(destination.to_string()));
        }
        Ok(())
    }
}
