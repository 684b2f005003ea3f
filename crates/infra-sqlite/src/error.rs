// sqlx::Error -> AppError mapping
// (cannot implement From<sqlx::Error> for AppError here due to orphan rules)

use waitline_core::error::AppError;

/// SQLite primary result codes (https://www.sqlite.org/rescode.html)
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// True if the error is a UNIQUE / PRIMARY KEY violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                || matches!(db_err.code().as_deref(), Some("2067") | Some("1555"))
        }
        _ => false,
    }
}

/// Convert sqlx::Error to AppError with structured information
///
/// Contention and connectivity problems become `TransientStore` so reads
/// can be retried; everything else is a permanent `Database` error.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let Some(code) = db_err.code() else {
                return AppError::Database(format!("Database error: {}", db_err.message()));
            };

            // Extended codes carry the primary code in the low byte
            let primary = code.parse::<i32>().map(|c| c & 0xff).unwrap_or(-1);
            match primary {
                SQLITE_BUSY | SQLITE_LOCKED => AppError::TransientStore(format!(
                    "Database locked [{}]: {}",
                    code,
                    db_err.message()
                )),
                _ if is_unique_violation(&err) => AppError::Database(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                13 => AppError::Database(format!("Database full: {}", db_err.message())),
                _ => AppError::Database(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::TransientStore(err.to_string())
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}
