//! Job Dispatcher.
//!
//! The synchronous half of a conversion request runs on the caller's
//! thread: validate, check idempotency, clear a stale failure, admit. The
//! rest is handed to the [`WorkerPool`] and observed only through the
//! Job State Store.
//!
//! Admission takes no application lock. The UNIQUE constraint on
//! `(item_id, variant)` decides which of two racing requests wins.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::converter::{ConverterInvoker, VariantCatalog};
use crate::credentials::{CredentialPayload, CredentialStager};
use crate::db::{item_repo, job_repo, Database, DatabaseError};
use crate::error::{DispatchError, WorkerError};
use crate::model::{ItemId, JobState, Variant};
use crate::worker::{ConversionTask, WorkerPool};

use super::executor::Executor;

/// Non-error results of [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A `processing` row was admitted and the conversion queued.
    Accepted { task_id: String },
    /// The key is already `completed`; only its timestamp was refreshed.
    AlreadyCompleted,
    /// Another request admitted the key first.
    AlreadyInFlight,
}

pub struct Dispatcher {
    db: Database,
    catalog: VariantCatalog,
    stager: CredentialStager,
    pool: WorkerPool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stager", &self.stager)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Builds a dispatcher and starts `worker_count` conversion workers.
    pub fn new(
        db: Database,
        invoker: Arc<dyn ConverterInvoker>,
        storage_root: impl Into<PathBuf>,
        stager: CredentialStager,
        worker_count: usize,
    ) -> Result<Self, WorkerError> {
        let storage_root = storage_root.into();
        let executor = Arc::new(Executor::new(
            db.clone(),
            Arc::clone(&invoker),
            storage_root.clone(),
        ));
        let pool = WorkerPool::new(executor, worker_count)?;

        Ok(Self {
            db,
            catalog: VariantCatalog::new(invoker, storage_root),
            stager,
            pool,
        })
    }

    /// Requests `variant` of `item_id`. Audio requests skip catalog
    /// validation; every other variant must be offered by the converter.
    ///
    /// The credential payload is staged once and used for both the probe
    /// and the conversion. It is released before this returns unless the
    /// request was accepted, in which case the conversion task owns it.
    pub fn dispatch(
        &self,
        item_id: &ItemId,
        variant: &Variant,
        credential: Option<&CredentialPayload>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let _span = tracing::info_span!(
            "dispatch",
            item_id = %item_id,
            variant = %variant,
        )
        .entered();

        if !item_repo::exists(&self.db, item_id)? {
            return Err(DispatchError::ItemNotFound(item_id.clone()));
        }

        let staged = self.stager.stage(credential, item_id)?;
        let credential_path = staged.as_ref().map(|s| s.path());

        if !variant.is_audio() {
            let available = self.catalog.list_variants(item_id, credential_path)?;
            if !available.contains(variant) {
                log::info!("Rejecting {} for {}: not offered", variant, item_id);
                return Err(DispatchError::VariantUnavailable {
                    item_id: item_id.clone(),
                    variant: variant.clone(),
                    available,
                });
            }
        }

        if job_repo::exists(&self.db, item_id, variant, JobState::Completed)? {
            job_repo::touch(&self.db, item_id, variant, JobState::Completed)?;
            log::info!("{} ({}) already completed", item_id, variant);
            return Ok(DispatchOutcome::AlreadyCompleted);
        }

        if job_repo::delete_with_state(&self.db, item_id, variant, JobState::Failed)? > 0 {
            log::info!("Retrying failed job {} ({})", item_id, variant);
        }

        match job_repo::insert_processing(&self.db, item_id, variant) {
            Ok(()) => {}
            Err(DatabaseError::DuplicateKey { .. }) => {
                log::info!("{} ({}) already in flight", item_id, variant);
                return Ok(DispatchOutcome::AlreadyInFlight);
            }
            Err(e) => return Err(e.into()),
        }

        let task = ConversionTask::new(item_id.clone(), variant.clone(), staged);
        let task_id = task.id.clone();
        if let Err(e) = self.pool.submit(task) {
            // The row must not stay `processing` with nothing behind it.
            if let Err(mark_err) = job_repo::mark_terminal(
                &self.db,
                item_id,
                variant,
                job_repo::TerminalUpdate::Failed,
            ) {
                log::error!("Failed to mark unqueued job {} as failed: {}", item_id, mark_err);
            }
            return Err(e.into());
        }

        log::info!("Accepted {} ({}) as task {}", item_id, variant, task_id);
        Ok(DispatchOutcome::Accepted { task_id })
    }

    /// Lists the variants the converter offers for `item_id`. The payload,
    /// if any, is staged for the probe and released before returning.
    pub fn probe_variants(
        &self,
        item_id: &ItemId,
        credential: Option<&CredentialPayload>,
    ) -> Result<Vec<Variant>, DispatchError> {
        let _span = tracing::info_span!("probe", item_id = %item_id).entered();

        let staged = self.stager.stage(credential, item_id)?;
        let variants = self
            .catalog
            .list_variants(item_id, staged.as_ref().map(|s| s.path()))?;
        Ok(variants)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Tasks accepted but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    /// Stops the workers after their current task. Queued tasks are marked
    /// `failed` so they can be dispatched again.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Waits for every accepted conversion to reach a terminal state.
    pub fn join(self) {
        self.pool.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Invocation, InvokeMode};
    use crate::error::{CatalogError, ConversionError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Counting {
        probes: AtomicUsize,
        converts: AtomicUsize,
    }

    impl ConverterInvoker for Counting {
        fn invoke(&self, invocation: &Invocation<'_>) -> Result<String, ConversionError> {
            match invocation.mode {
                InvokeMode::ProbeVariants => {
                    self.probes.fetch_add(1, Ordering::SeqCst);
                    Ok("['360p', '720p']".to_string())
                }
                InvokeMode::Convert(variant) => {
                    self.converts.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("/store/{}-{}", invocation.item_id, variant))
                }
            }
        }
    }

    fn setup(invoker: Arc<Counting>, dir: &TempDir) -> Dispatcher {
        let db = Database::open_in_memory().unwrap();
        item_repo::insert(
            &db,
            &item_repo::NewItem {
                item_id: ItemId::new("abc123").unwrap(),
                owner_id: None,
                title: "Title".to_string(),
                requested_by_ip: "127.0.0.1".to_string(),
            },
        )
        .unwrap();
        Dispatcher::new(db, invoker, "/store", CredentialStager::new(dir.path()), 1).unwrap()
    }

    #[test]
    fn test_unknown_item_rejected() {
        let dir = TempDir::new().unwrap();
        let dispatcher = setup(Arc::new(Counting::default()), &dir);
        let err = dispatcher
            .dispatch(&ItemId::new("missing").unwrap(), &Variant::audio(), None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::ItemNotFound(_)));
        dispatcher.join();
    }

    #[test]
    fn test_audio_skips_catalog() {
        let dir = TempDir::new().unwrap();
        let invoker = Arc::new(Counting::default());
        let dispatcher = setup(Arc::clone(&invoker), &dir);
        let item = ItemId::new("abc123").unwrap();

        let outcome = dispatcher.dispatch(&item, &Variant::audio(), None).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Accepted { .. }));
        let db = dispatcher.database().clone();
        dispatcher.join();

        assert_eq!(invoker.probes.load(Ordering::SeqCst), 0);
        assert_eq!(invoker.converts.load(Ordering::SeqCst), 1);
        let row = job_repo::find(&db, &item, &Variant::audio()).unwrap().unwrap();
        assert_eq!(row.state, JobState::Completed);
    }

    #[test]
    fn test_unavailable_variant_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let dispatcher = setup(Arc::new(Counting::default()), &dir);
        let item = ItemId::new("abc123").unwrap();

        let err = dispatcher
            .dispatch(&item, &Variant::new("4320p").unwrap(), None)
            .unwrap_err();
        match err {
            DispatchError::VariantUnavailable { available, .. } => {
                assert_eq!(available.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(job_repo::list_by_item(dispatcher.database(), &item)
            .unwrap()
            .is_empty());
        dispatcher.join();
    }

    #[test]
    fn test_probe_variants_releases_credential() {
        let dir = TempDir::new().unwrap();
        let dispatcher = setup(Arc::new(Counting::default()), &dir);
        let item = ItemId::new("abc123").unwrap();

        let variants = dispatcher
            .probe_variants(&item, Some(&CredentialPayload::from(b"cookie".to_vec())))
            .unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        dispatcher.join();
    }

    struct EmptyCatalog;

    impl ConverterInvoker for EmptyCatalog {
        fn invoke(&self, _invocation: &Invocation<'_>) -> Result<String, ConversionError> {
            Ok("[]".to_string())
        }
    }

    #[test]
    fn test_empty_catalog_is_reported() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let item = ItemId::new("abc123").unwrap();
        item_repo::insert(
            &db,
            &item_repo::NewItem {
                item_id: item.clone(),
                owner_id: None,
                title: "Title".to_string(),
                requested_by_ip: "127.0.0.1".to_string(),
            },
        )
        .unwrap();
        let dispatcher = Dispatcher::new(
            db,
            Arc::new(EmptyCatalog),
            "/store",
            CredentialStager::new(dir.path()),
            1,
        )
        .unwrap();

        let err = dispatcher
            .dispatch(&item, &Variant::new("720p").unwrap(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Catalog(CatalogError::NoVariantsAvailable(_))
        ));
        dispatcher.join();
    }
}
