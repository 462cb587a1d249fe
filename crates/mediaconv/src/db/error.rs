//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{ItemId, Variant};

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// A row with the same (item, variant) key already exists.
    #[error("Job for item '{item_id}' variant '{variant}' already exists")]
    DuplicateKey { item_id: ItemId, variant: Variant },

    /// No `processing` job row matches the (item, variant) key.
    #[error("No processing job for item '{item_id}' variant '{variant}'")]
    JobNotFound { item_id: ItemId, variant: Variant },
}

impl DatabaseError {
    /// Returns true if the underlying SQLite error is a UNIQUE constraint
    /// violation.
    pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}
