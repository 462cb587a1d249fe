//! The stored cookie bundle: one administrator-managed cookie file that
//! the converter falls back to when a request brings none of its own.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CredentialError;

/// Smallest accepted upload, in bytes.
pub const MIN_COOKIE_FILE_SIZE: u64 = 512;
/// Largest accepted upload, in bytes.
pub const MAX_COOKIE_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// What [`CookieStore::info`] reports about the bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CookieInfo {
    pub exists: bool,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub absolute_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replaces the bundle with `bytes`. `name` is the uploaded file's
    /// original name and must end in `.txt`.
    pub fn upload(&self, name: &str, bytes: &[u8]) -> Result<CookieInfo, CredentialError> {
        let has_txt_extension = Path::new(name)
            .extension()
            .is_some_and(|ext| ext == "txt");
        if !has_txt_extension {
            return Err(CredentialError::InvalidExtension {
                name: name.to_string(),
            });
        }

        let size = bytes.len() as u64;
        if !(MIN_COOKIE_FILE_SIZE..=MAX_COOKIE_FILE_SIZE).contains(&size) {
            return Err(CredentialError::InvalidSize {
                size,
                min: MIN_COOKIE_FILE_SIZE,
                max: MAX_COOKIE_FILE_SIZE,
            });
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CredentialError::CreateFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Write beside the target, then rename, so readers never see a
        // half-written bundle.
        let tmp = self.path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        write_private(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                log::warn!("Failed to remove temporary cookie file: {}", cleanup);
            }
            return Err(CredentialError::WriteFile {
                path: self.path.clone(),
                source: e,
            });
        }

        log::info!("Stored cookie bundle updated ({} bytes)", size);
        self.info()
    }

    pub fn info(&self) -> Result<CookieInfo, CredentialError> {
        let absolute_path =
            std::path::absolute(&self.path).map_err(|e| CredentialError::Inspect {
                path: self.path.clone(),
                source: e,
            })?;

        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CookieInfo {
                    exists: false,
                    size_bytes: 0,
                    last_modified: None,
                    absolute_path,
                });
            }
            Err(e) => {
                return Err(CredentialError::Inspect {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        Ok(CookieInfo {
            exists: true,
            size_bytes: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            absolute_path,
        })
    }

    pub fn remove(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Stored cookie bundle removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CredentialError::NotFound(self.path.clone()))
            }
            Err(e) => Err(CredentialError::RemoveFile {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> Result<(), CredentialError> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| CredentialError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| CredentialError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
}
