//! Lookup of finished artifacts for download.

use std::path::PathBuf;

use serde::Serialize;

use crate::db::{item_repo, job_repo, Database};
use crate::error::LookupError;
use crate::model::{ItemId, JobState, Variant};

/// A completed artifact and the title to name the download after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactLocation {
    pub item_id: ItemId,
    pub variant: Variant,
    pub path: PathBuf,
    pub title: String,
}

/// Finds the completed artifact of `(item_id, variant)`.
///
/// A completed row whose file has vanished from disk is reported as
/// [`LookupError::ArtifactMissing`] and left in place for inspection.
pub fn locate_artifact(
    db: &Database,
    item_id: &ItemId,
    variant: &Variant,
) -> Result<ArtifactLocation, LookupError> {
    let not_found = || LookupError::NotFound {
        item_id: item_id.clone(),
        variant: variant.clone(),
    };

    let job = job_repo::find(db, item_id, variant)?
        .filter(|job| job.state == JobState::Completed)
        .ok_or_else(not_found)?;
    let path = job.artifact_path.ok_or_else(not_found)?;

    if !path.exists() {
        log::warn!(
            "Artifact {} for {} ({}) is missing",
            path.display(),
            item_id,
            variant
        );
        return Err(LookupError::ArtifactMissing {
            item_id: item_id.clone(),
            variant: variant.clone(),
            path,
        });
    }

    let title = item_repo::find(db, item_id)?
        .map(|item| item.title)
        .unwrap_or_else(|| item_id.to_string());

    Ok(ArtifactLocation {
        item_id: item_id.clone(),
        variant: variant.clone(),
        path,
        title,
    })
}
