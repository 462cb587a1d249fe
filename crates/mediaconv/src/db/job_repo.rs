//! Job repository over the `jobs` table.
//!
//! Each operation is a single statement. Rows are keyed by
//! `(item_id, variant)`; the UNIQUE constraint on that pair is the only
//! guard against two concurrent admissions of the same key.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{now_timestamp, Database, DatabaseError};
use crate::model::{ItemId, JobState, Variant};

/// A job row from the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRow {
    pub id: i64,
    pub item_id: ItemId,
    pub variant: Variant,
    pub artifact_path: Option<PathBuf>,
    pub state: JobState,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let artifact_path: Option<String> = row.get("artifact_path")?;
        Ok(Self {
            id: row.get("id")?,
            item_id: row.get("item_id")?,
            variant: row.get("variant")?,
            artifact_path: artifact_path.map(PathBuf::from),
            state: row.get("state")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// The terminal transition recorded by [`mark_terminal`]. A completed job
/// always carries its artifact path; a failed one never does.
#[derive(Debug, Clone, Copy)]
pub enum TerminalUpdate<'a> {
    Completed(&'a Path),
    Failed,
}

impl TerminalUpdate<'_> {
    pub fn state(&self) -> JobState {
        match self {
            TerminalUpdate::Completed(_) => JobState::Completed,
            TerminalUpdate::Failed => JobState::Failed,
        }
    }
}

pub fn exists(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
    state: JobState,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM jobs WHERE item_id = ?1 AND variant = ?2 AND state = ?3)",
            params![item_id, variant, state],
            |r| r.get(0),
        )?;
        Ok(exists)
    })
}

/// Admits a new `processing` row. Fails with [`DatabaseError::DuplicateKey`]
/// if any row for the key already exists.
pub fn insert_processing(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (item_id, variant, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![item_id, variant, JobState::Processing, now],
        )
        .map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                DatabaseError::DuplicateKey {
                    item_id: item_id.clone(),
                    variant: variant.clone(),
                }
            } else {
                DatabaseError::Sqlite(e)
            }
        })?;
        Ok(())
    })
}

/// Records the terminal state of a `processing` job and refreshes its
/// `updated_at`. Rows already terminal are left alone and reported as
/// [`DatabaseError::JobNotFound`].
pub fn mark_terminal(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
    update: TerminalUpdate<'_>,
) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    let path = match update {
        TerminalUpdate::Completed(path) => Some(path.to_string_lossy().into_owned()),
        TerminalUpdate::Failed => None,
    };
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET state = ?3, artifact_path = ?4, updated_at = ?5
             WHERE item_id = ?1 AND variant = ?2 AND state = ?6",
            params![
                item_id,
                variant,
                update.state(),
                path,
                now,
                JobState::Processing
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::JobNotFound {
                item_id: item_id.clone(),
                variant: variant.clone(),
            });
        }
        Ok(())
    })
}

/// Lists every job of an item, oldest first.
pub fn list_by_item(db: &Database, item_id: &ItemId) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| list_by_item_on(conn, item_id))
}

pub(crate) fn list_by_item_on(
    conn: &Connection,
    item_id: &ItemId,
) -> Result<Vec<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE item_id = ?1 ORDER BY created_at, id")?;
    let rows = stmt
        .query_map(params![item_id], JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM jobs WHERE item_id = ?1 AND variant = ?2",
                params![item_id, variant],
                JobRow::from_row,
            )
            .optional()?)
    })
}

/// Deletes the row for the key if it is in `state`. Returns the number of
/// rows removed (0 or 1).
pub fn delete_with_state(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
    state: JobState,
) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.execute(
            "DELETE FROM jobs WHERE item_id = ?1 AND variant = ?2 AND state = ?3",
            params![item_id, variant, state],
        )?)
    })
}

/// Refreshes `updated_at` of the row for the key if it is in `state`.
pub fn touch(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
    state: JobState,
) -> Result<bool, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET updated_at = ?4 WHERE item_id = ?1 AND variant = ?2 AND state = ?3",
            params![item_id, variant, state, now],
        )?;
        Ok(changed > 0)
    })
}

pub(crate) fn delete_by_item_on(
    conn: &Connection,
    item_id: &ItemId,
) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM jobs WHERE item_id = ?1", params![item_id])?)
}
