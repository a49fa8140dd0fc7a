//! Error types for the Gatehouse RBAC graph.

use thiserror::Error;

/// Stable classification of an [`RbacError`], suitable for mapping onto
/// transport status codes by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Integrity,
    Database,
    Crypto,
    Internal,
}

#[derive(Debug, Error)]
pub enum RbacError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict on {entity}: {message}")]
    Conflict { entity: String, message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Cannot delete {entity} {id}: {reason}")]
    Integrity {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RbacError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Database(_) => ErrorKind::Database,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type RbacResult<T> = Result<T, RbacError>;
