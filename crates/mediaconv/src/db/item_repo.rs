//! Item repository: operations on the `items` table.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{now_timestamp, Database, DatabaseError};
use crate::model::ItemId;

/// A registered media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub item_id: ItemId,
    pub owner_id: Option<i64>,
    pub title: String,
    pub requested_by_ip: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            item_id: row.get("item_id")?,
            owner_id: row.get("owner_id")?,
            title: row.get("title")?,
            requested_by_ip: row.get("requested_by_ip")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Fields supplied when registering a new item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub item_id: ItemId,
    pub owner_id: Option<i64>,
    pub title: String,
    pub requested_by_ip: String,
}

/// Inserts a new item. Fails with a UNIQUE violation if the identifier is
/// already registered.
pub fn insert(db: &Database, item: &NewItem) -> Result<(), DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO items (item_id, owner_id, title, requested_by_ip, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                item.item_id,
                item.owner_id,
                item.title,
                item.requested_by_ip,
                now
            ],
        )?;
        Ok(())
    })
}

/// Finds an item by identifier.
pub fn find(db: &Database, item_id: &ItemId) -> Result<Option<ItemRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM items WHERE item_id = ?1",
                params![item_id],
                ItemRow::from_row,
            )
            .optional()?)
    })
}

pub fn exists(db: &Database, item_id: &ItemId) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ?1)",
            params![item_id],
            |r| r.get(0),
        )?;
        Ok(exists)
    })
}

/// Lists all items in registration order.
pub fn list(db: &Database) -> Result<Vec<ItemRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM items ORDER BY created_at, id")?;
        let rows = stmt
            .query_map([], ItemRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Refreshes `updated_at`. Returns false if the item does not exist.
pub fn touch(db: &Database, item_id: &ItemId) -> Result<bool, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE items SET updated_at = ?2 WHERE item_id = ?1",
            params![item_id, now],
        )?;
        Ok(changed > 0)
    })
}

/// Deletes the item row on an open connection or transaction. Returns the
/// number of rows removed.
pub(crate) fn delete_on(conn: &Connection, item_id: &ItemId) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM items WHERE item_id = ?1", params![item_id])?)
}
