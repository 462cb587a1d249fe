//! The asynchronous half of a dispatch: convert, reconcile, clean up.

use std::path::PathBuf;
use std::sync::Arc;

use crate::converter::ConverterInvoker;
use crate::db::job_repo::{self, TerminalUpdate};
use crate::db::{item_repo, Database, DatabaseError};
use crate::model::JobState;
use crate::worker::ConversionTask;

/// Runs admitted tasks to a terminal state. Shared by every worker.
pub struct Executor {
    db: Database,
    invoker: Arc<dyn ConverterInvoker>,
    storage_root: PathBuf,
}

impl Executor {
    pub fn new(
        db: Database,
        invoker: Arc<dyn ConverterInvoker>,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            invoker,
            storage_root: storage_root.into(),
        }
    }

    /// Converts, records the terminal state and releases the task's
    /// credential. Returns the state that was recorded.
    pub fn execute(&self, task: ConversionTask) -> JobState {
        let _span = tracing::info_span!(
            "convert",
            task_id = %task.id,
            item_id = %task.item_id,
            variant = %task.variant,
        )
        .entered();

        let result = self.invoker.convert(
            &task.item_id,
            &task.variant,
            &self.storage_root,
            task.credential_path(),
        );

        let update = match &result {
            Ok(path) => {
                log::info!(
                    "Converted {} ({}) to {}",
                    task.item_id,
                    task.variant,
                    path.display()
                );
                TerminalUpdate::Completed(path.as_path())
            }
            Err(e) => {
                log::warn!("Conversion of {} ({}) failed: {}", task.item_id, task.variant, e);
                TerminalUpdate::Failed
            }
        };
        let state = update.state();

        match job_repo::mark_terminal(&self.db, &task.item_id, &task.variant, update) {
            Ok(()) => {}
            Err(DatabaseError::JobNotFound { .. }) => {
                log::warn!(
                    "Job {} ({}) is no longer processing; result discarded",
                    task.item_id,
                    task.variant
                );
            }
            Err(e) => {
                log::error!(
                    "Failed to record {} for {} ({}): {}",
                    state,
                    task.item_id,
                    task.variant,
                    e
                );
            }
        }

        match item_repo::touch(&self.db, &task.item_id) {
            Ok(_) => {}
            Err(e) => log::warn!("Failed to refresh item {} timestamp: {}", task.item_id, e),
        }

        if let Some(credential) = task.credential {
            credential.release();
        }

        state
    }

    /// Marks a task that will never run as `failed` so the key can be
    /// dispatched again, and releases its credential.
    pub fn abandon(&self, task: ConversionTask) {
        let update = TerminalUpdate::Failed;
        match job_repo::mark_terminal(&self.db, &task.item_id, &task.variant, update) {
            Ok(()) => log::warn!(
                "Task {} for {} ({}) abandoned before running",
                task.id,
                task.item_id,
                task.variant
            ),
            Err(DatabaseError::JobNotFound { .. }) => {}
            Err(e) => log::error!(
                "Failed to mark abandoned job {} ({}) as failed: {}",
                task.item_id,
                task.variant,
                e
            ),
        }

        if let Some(credential) = task.credential {
            credential.release();
        }
    }
}
