//! Cascade Deletion Coordinator.
//!
//! Rows are deleted inside one transaction that commits only after every
//! recorded artifact has been removed from disk. A missing or unremovable
//! artifact rolls everything back.

use std::io;
use std::path::PathBuf;

use serde::Serialize;

use crate::db::{item_repo, job_repo, Database};
use crate::error::DeletionError;
use crate::model::ItemId;

/// What a successful [`delete_item`] removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionReport {
    pub item_id: ItemId,
    pub jobs_removed: usize,
    pub artifacts_removed: Vec<PathBuf>,
}

pub fn delete_item(db: &Database, item_id: &ItemId) -> Result<DeletionReport, DeletionError> {
    let _span = tracing::info_span!("delete_item", item_id = %item_id).entered();

    let report = db.with_transaction(|tx| {
        let jobs = job_repo::list_by_item_on(tx, item_id)?;
        let jobs_removed = job_repo::delete_by_item_on(tx, item_id)?;

        if item_repo::delete_on(tx, item_id)? == 0 {
            return Err(DeletionError::ItemNotFound(item_id.clone()));
        }

        let artifacts: Vec<PathBuf> = jobs
            .into_iter()
            .filter_map(|job| job.artifact_path)
            .collect();

        // Check every artifact before removing any, so a missing file
        // aborts without touching the others.
        for path in &artifacts {
            if let Err(e) = std::fs::symlink_metadata(path) {
                return Err(DeletionError::PartialArtifactLoss {
                    path: path.clone(),
                    source: e,
                });
            }
        }

        for path in &artifacts {
            std::fs::remove_file(path).map_err(|e| DeletionError::PartialArtifactLoss {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Removed artifact {}", path.display());
        }

        Ok(DeletionReport {
            item_id: item_id.clone(),
            jobs_removed,
            artifacts_removed: artifacts,
        })
    });

    match &report {
        Ok(report) => log::info!(
            "Deleted item {} ({} jobs, {} artifacts)",
            item_id,
            report.jobs_removed,
            report.artifacts_removed.len()
        ),
        Err(DeletionError::PartialArtifactLoss { path, source }) => log::error!(
            "Deletion of {} rolled back; artifact {} {}",
            item_id,
            path.display(),
            if source.kind() == io::ErrorKind::NotFound {
                "is missing".to_string()
            } else {
                format!("could not be removed: {}", source)
            }
        ),
        Err(e) => log::warn!("Deletion of {} failed: {}", item_id, e),
    }

    report
}
