// SQLite DestinationRepository Implementation

use crate::connection::WriteLock;
use crate::error::{is_unique_violation, map_sqlx_error};
use async_trait::async_trait;
use sqlx::SqlitePool;
use waitline_core::domain::{ContactInfo, Destination, DestinationId};
use waitline_core::error::{AppError, Result};
use waitline_core::port::DestinationRepository;

pub(crate) const DESTINATION_COLUMNS: &str =
    "id, display_name, website, phone, entry_rate, day_count, last_reset_at, created_at";

pub struct SqliteDestinationRepository {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl SqliteDestinationRepository {
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        Self { pool, write_lock }
    }
}

/// Escape LIKE wildcards so user input matches literally
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl DestinationRepository for SqliteDestinationRepository {
    async fn insert(&self, destination: &Destination) -> Result<()> {
        let _guard = self.write_lock.acquire().await;

        sqlx::query(
            r#"
            INSERT INTO destinations (
                id, display_name, website, phone, entry_rate,
                day_count, last_reset_at, created_at, last_sequence
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(destination.id.as_str())
        .bind(&destination.display_name)
        .bind(&destination.contact.website)
        .bind(&destination.contact.phone)
        .bind(i64::from(destination.entry_rate))
        .bind(to_i64(destination.day_count))
        .bind(destination.last_reset_at)
        .bind(destination.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateName(destination.display_name.clone())
            } else {
                map_sqlx_error(e)
            }
        })?;

        Ok(())
    }

    async fn get(&self, id: &DestinationId) -> Result<Option<Destination>> {
        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            "SELECT {} FROM destinations WHERE id = ?",
            DESTINATION_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(DestinationRow::into_destination).transpose()
    }

    async fn search(&self, query: &str) -> Result<Vec<Destination>> {
        let rows = sqlx::query_as::<_, DestinationRow>(&format!(
            "SELECT {} FROM destinations WHERE id LIKE ? ESCAPE '\\' ORDER BY id",
            DESTINATION_COLUMNS
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(DestinationRow::into_destination).collect()
    }

    async fn reset_day_counts(&self, boundary_millis: i64, now_millis: i64) -> Result<u64> {
        let _guard = self.write_lock.acquire().await;

        let result = sqlx::query(
            "UPDATE destinations SET day_count = 0, last_reset_at = ? WHERE last_reset_at < ?",
        )
        .bind(now_millis)
        .bind(boundary_millis)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DestinationRow {
    id: String,
    display_name: String,
    website: String,
    phone: String,
    entry_rate: i64,
    day_count: i64,
    last_reset_at: i64,
    created_at: i64,
}

impl DestinationRow {
    pub(crate) fn into_destination(self) -> Result<Destination> {
        let entry_rate = u32::try_from(self.entry_rate).map_err(|_| {
            AppError::Database(format!(
                "Corrupt entry_rate {} for destination {}",
                self.entry_rate, self.id
            ))
        })?;

        Ok(Destination {
            id: DestinationId::from_name(&self.id),
            display_name: self.display_name,
            contact: ContactInfo {
                website: self.website,
                phone: self.phone,
            },
            entry_rate,
            day_count: u64::try_from(self.day_count).unwrap_or(0),
            last_reset_at: self.last_reset_at,
            created_at: self.created_at,
        })
    }
}
