//! Credential Staging.
//!
//! A request's credential payload is written to a uniquely named file that
//! lives exactly as long as the [`StagedCredential`] guard returned for it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretSlice};

use crate::error::CredentialError;
use crate::model::ItemId;
use crate::sanitize::redact_path;

/// Opaque credential bytes supplied by the caller.
pub type CredentialPayload = SecretSlice<u8>;

/// Creates staged credential files in one directory.
#[derive(Debug, Clone)]
pub struct CredentialStager {
    dir: PathBuf,
    fallback: Option<PathBuf>,
}

impl CredentialStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallback: None,
        }
    }

    /// Uses `path` (the stored cookie bundle) whenever a request carries no
    /// payload and the file exists. The fallback file is never removed.
    pub fn with_fallback(mut self, path: Option<PathBuf>) -> Self {
        self.fallback = path;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stages `payload` for a converter call on `item_id`.
    ///
    /// Returns `None` when there is nothing to hand to the converter. An
    /// empty payload counts as absent.
    pub fn stage(
        &self,
        payload: Option<&CredentialPayload>,
        item_id: &ItemId,
    ) -> Result<Option<StagedCredential>, CredentialError> {
        let bytes = payload
            .map(|p| p.expose_secret())
            .filter(|bytes| !bytes.is_empty());

        let Some(bytes) = bytes else {
            return Ok(self.fallback_credential());
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| CredentialError::CreateFile {
            path: self.dir.clone(),
            source: e,
        })?;

        let file_name = format!("cookies_{}_{}.txt", item_id, uuid::Uuid::new_v4());
        let path = self.dir.join(file_name);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&path)
            .map_err(|e| CredentialError::CreateFile {
                path: path.clone(),
                source: e,
            })?;

        // The guard exists before the write so a failed write still cleans up.
        let staged = StagedCredential::owned(path);
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|e| CredentialError::WriteFile {
                path: staged.path.clone(),
                source: e,
            })?;

        log::debug!(
            "Staged credential {} for {}",
            redact_path(&staged.path),
            item_id
        );
        Ok(Some(staged))
    }

    fn fallback_credential(&self) -> Option<StagedCredential> {
        self.fallback
            .as_ref()
            .filter(|path| path.is_file())
            .map(|path| StagedCredential::borrowed(path.clone()))
    }
}

/// RAII guard for a staged credential file.
///
/// An owned file is removed when the guard is dropped or released, on every
/// exit path of the operation holding it. Removal failures are logged and
/// never escalated.
#[derive(Debug)]
pub struct StagedCredential {
    path: PathBuf,
    owned: bool,
}

impl StagedCredential {
    fn owned(path: PathBuf) -> Self {
        Self { path, owned: true }
    }

    fn borrowed(path: PathBuf) -> Self {
        Self { path, owned: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether dropping this guard deletes the file.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Releases the credential now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StagedCredential {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!(
                "Failed to remove staged credential {}: {}",
                redact_path(&self.path),
                e
            );
        }
    }
}
