//! Database-specific error types and conversions.

use gatehouse_core::error::RbacError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique constraint violated on {entity}: {message}")]
    Conflict { entity: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Transaction on {entity} lost a write conflict: {message}")]
    Contended { entity: String, message: String },
}

impl DbError {
    /// Classify an error reported by `Response::check`. Unique index
    /// violations become [`DbError::Conflict`].
    pub(crate) fn checked(entity: &str, err: surrealdb::Error) -> Self {
        Self::classify(entity, err.to_string())
    }

    /// Unique index violations become [`DbError::Conflict`], retryable
    /// commit conflicts [`DbError::Contended`].
    pub(crate) fn classify(entity: &str, message: String) -> Self {
        if message.contains("already contains") {
            DbError::Conflict {
                entity: entity.into(),
                message,
            }
        } else if message.contains("can be retried") || message.contains("write conflict") {
            DbError::Contended {
                entity: entity.into(),
                message,
            }
        } else {
            DbError::Query(message)
        }
    }

    /// Whether a guarded script aborted with `THROW "<reason>"`.
    pub(crate) fn raised(&self, reason: &str) -> bool {
        matches!(self, DbError::Query(message) if message.contains(reason))
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for RbacError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => RbacError::NotFound { entity, id },
            DbError::Conflict { entity, message } => RbacError::Conflict { entity, message },
            other => RbacError::Database(other.to_string()),
        }
    }
}
