//! Item registration from a source URL.

use serde::Serialize;

use crate::db::item_repo::{self, ItemRow, NewItem};
use crate::db::{Database, DatabaseError};
use crate::error::SourceError;
use crate::model::ItemId;

use super::{parse_source_url, MetadataSource};

#[derive(Debug, Clone)]
pub struct RegistrationRequest<'a> {
    pub url: &'a str,
    pub owner_id: Option<i64>,
    pub requested_by_ip: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "item", rename_all = "snake_case")]
pub enum Registration {
    Created(ItemRow),
    /// The identifier was known; only its `updated_at` was refreshed.
    AlreadyRegistered(ItemRow),
}

impl Registration {
    pub fn item(&self) -> &ItemRow {
        match self {
            Registration::Created(item) | Registration::AlreadyRegistered(item) => item,
        }
    }
}

/// Registers the item behind `request.url`, fetching its title upstream.
pub async fn register_item(
    db: &Database,
    metadata: &dyn MetadataSource,
    request: RegistrationRequest<'_>,
) -> Result<Registration, SourceError> {
    let item_id = parse_source_url(request.url)?;

    if let Some(existing) = refresh_existing(db, &item_id)? {
        return Ok(existing);
    }

    let title = metadata.fetch_title(&item_id).await?;

    let new_item = NewItem {
        item_id: item_id.clone(),
        owner_id: request.owner_id,
        title,
        requested_by_ip: request.requested_by_ip.to_string(),
    };

    match item_repo::insert(db, &new_item) {
        Ok(()) => {}
        // Registered concurrently since the check above.
        Err(DatabaseError::Sqlite(e)) if DatabaseError::is_unique_violation(&e) => {
            if let Some(existing) = refresh_existing(db, &item_id)? {
                return Ok(existing);
            }
            return Err(DatabaseError::Sqlite(e).into());
        }
        Err(e) => return Err(e.into()),
    }

    let row = item_repo::find(db, &item_id)?
        .ok_or_else(|| SourceError::NotFound(item_id.clone()))?;
    log::info!("Registered item {} ({})", row.item_id, row.title);
    Ok(Registration::Created(row))
}

fn refresh_existing(db: &Database, item_id: &ItemId) -> Result<Option<Registration>, SourceError> {
    if !item_repo::exists(db, item_id)? {
        return Ok(None);
    }

    if let Err(e) = item_repo::touch(db, item_id) {
        log::warn!("Failed to refresh item {} timestamp: {}", item_id, e);
    }

    Ok(item_repo::find(db, item_id)?.map(Registration::AlreadyRegistered))
}
