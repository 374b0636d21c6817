//! Database error types for sprig-db.

use thiserror::Error;

/// Errors from storage operations, lifecycle actions, jobs, and bundles.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned unparseable data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not allowed in the row's current state
    /// (wrong crop stage, terminal order status, ...).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Caller input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An export/import bundle is malformed or does not match its manifest.
    #[error("Bundle error: {0}")]
    Bundle(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Filesystem error (bundles).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sprig_core::errors::CoreError> for DatabaseError {
    fn from(error: sprig_core::errors::CoreError) -> Self {
        use sprig_core::errors::CoreError;
        match error {
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::NotFound { entity_type, id } => {
                Self::InvalidState(format!("{entity_type} not found: {id}"))
            }
            other @ CoreError::InvalidTransition { .. } => Self::InvalidState(other.to_string()),
            CoreError::Other(e) => Self::Other(e),
        }
    }
}
