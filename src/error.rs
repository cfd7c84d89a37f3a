//! Typed error taxonomy shared across the service, store and reporting layers.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PotatoError {
    /// Malformed or out-of-range input. Recoverable by the caller fixing the
    /// request; never retried automatically.
    #[error("validation error: {0}")]
    Validation(String),

    /// No active task (or archived task) with the given id.
    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    /// User id not present in the configured roster.
    #[error("user '{0}' not found in roster")]
    UserNotFound(String),

    /// Concurrent mutation collision: the caller's expected version no longer
    /// matches the stored one. Retry with a fresh read.
    #[error("version conflict on task {id}: expected {expected}, found {found}")]
    Conflict { id: Uuid, expected: u64, found: u64 },

    /// Persistence I/O failed after bounded retries.
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Idempotency guard: the user already holds this achievement.
    #[error("user '{user_id}' already holds achievement '{achievement_id}'")]
    DuplicateAchievement {
        user_id: String,
        achievement_id: String,
    },

    #[error("corrupt data file {path}: {source}")]
    CorruptData {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PotatoError>;
