//! Test harness for isolated dispatch/deletion scenarios.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use tempfile::TempDir;

use mediaconv::converter::{ConverterInvoker, Invocation, InvokeMode};
use mediaconv::db::item_repo::{self, NewItem};
use mediaconv::{
    ConversionError, CredentialPayload, CredentialStager, Database, Dispatcher, ItemId, Variant,
};

/// In-process converter. Conversions write a small file into the storage
/// root and return its path, like the real program does.
pub struct ScriptedConverter {
    catalog_line: String,
    failing: Mutex<HashSet<String>>,
    gate: Gate,
    pub probes: AtomicUsize,
    pub converts: AtomicUsize,
    /// Every credential path handed over, with whether it existed at the time.
    pub credentials_seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl ScriptedConverter {
    pub fn new(catalog: &[&str]) -> Self {
        let quoted: Vec<String> = catalog.iter().map(|v| format!("'{}'", v)).collect();
        Self {
            catalog_line: format!("[{}]", quoted.join(", ")),
            failing: Mutex::new(HashSet::new()),
            gate: Gate::default(),
            probes: AtomicUsize::new(0),
            converts: AtomicUsize::new(0),
            credentials_seen: Mutex::new(Vec::new()),
        }
    }

    /// Makes conversions of `variant` fail until [`succeed`](Self::succeed).
    pub fn fail(&self, variant: &str) {
        self.failing.lock().unwrap().insert(variant.to_string());
    }

    pub fn succeed(&self, variant: &str) {
        self.failing.lock().unwrap().remove(variant);
    }

    /// Blocks conversions until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.set(true);
    }

    pub fn release(&self) {
        self.gate.set(false);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn convert_count(&self) -> usize {
        self.converts.load(Ordering::SeqCst)
    }

    pub fn credentials_seen(&self) -> Vec<(PathBuf, bool)> {
        self.credentials_seen.lock().unwrap().clone()
    }
}

impl ConverterInvoker for ScriptedConverter {
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<String, ConversionError> {
        if let Some(path) = invocation.credential_path {
            self.credentials_seen
                .lock()
                .unwrap()
                .push((path.to_path_buf(), path.exists()));
        }

        match invocation.mode {
            InvokeMode::ProbeVariants => {
                self.probes.fetch_add(1, Ordering::SeqCst);
                Ok(self.catalog_line.clone())
            }
            InvokeMode::Convert(variant) => {
                self.gate.wait_open();
                self.converts.fetch_add(1, Ordering::SeqCst);

                if self.failing.lock().unwrap().contains(variant.as_str()) {
                    return Err(ConversionError::ConverterReported {
                        code: Some(1),
                        line: "ERROR: Requested format is not available".to_string(),
                    });
                }

                let file_name = if variant.is_audio() {
                    format!("{}.mp3", invocation.item_id)
                } else {
                    format!("{}-{}.mp4", invocation.item_id, variant)
                };
                let path = invocation.storage_root.join(file_name);
                std::fs::write(&path, b"media").map_err(|e| ConversionError::ProcessLaunch {
                    program: "scripted".to_string(),
                    source: e,
                })?;
                Ok(path.to_string_lossy().into_owned())
            }
        }
    }
}

#[derive(Default)]
struct Gate {
    held: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    fn set(&self, held: bool) {
        *self.held.lock().unwrap() = held;
        self.changed.notify_all();
    }

    fn wait_open(&self) {
        let mut held = self.held.lock().unwrap();
        while *held {
            held = self.changed.wait(held).unwrap();
        }
    }
}

/// Isolated environment: temp directories, in-memory database and a
/// scripted converter.
pub struct TestHarness {
    temp_dir: TempDir,
    pub store_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub db: Database,
    pub converter: Arc<ScriptedConverter>,
}

impl TestHarness {
    pub fn new(catalog: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store_dir = temp_dir.path().join("store");
        let staging_dir = temp_dir.path().join("staging");
        std::fs::create_dir_all(&store_dir).expect("Failed to create store dir");
        std::fs::create_dir_all(&staging_dir).expect("Failed to create staging dir");

        Self {
            temp_dir,
            store_dir,
            staging_dir,
            db: Database::open_in_memory().expect("Failed to open database"),
            converter: Arc::new(ScriptedConverter::new(catalog)),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher_with(CredentialStager::new(&self.staging_dir))
    }

    pub fn dispatcher_with(&self, stager: CredentialStager) -> Dispatcher {
        Dispatcher::new(
            self.db.clone(),
            self.converter.clone(),
            &self.store_dir,
            stager,
            2,
        )
        .expect("Failed to start dispatcher")
    }

    pub fn seed_item(&self, id: &str) -> ItemId {
        let item_id = ItemId::new(id).expect("valid item id");
        item_repo::insert(
            &self.db,
            &NewItem {
                item_id: item_id.clone(),
                owner_id: Some(1),
                title: format!("Video {}", id),
                requested_by_ip: "127.0.0.1".to_string(),
            },
        )
        .expect("Failed to seed item");
        item_id
    }

    /// Number of files currently in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(&self.staging_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn variant(label: &str) -> Variant {
    Variant::new(label).expect("valid variant")
}

pub fn cookies(content: &str) -> CredentialPayload {
    CredentialPayload::from(content.as_bytes().to_vec())
}
