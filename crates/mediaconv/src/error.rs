use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::model::{ItemId, Variant};
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum MediaconvError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Deletion error: {0}")]
    Deletion(#[from] DeletionError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid item identifier '{0}'")]
    InvalidItemId(String),

    #[error("Invalid variant label '{0}'")]
    InvalidVariant(String),

    #[error("Unknown job state '{0}'")]
    UnknownJobState(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failure classes of a converter invocation. All of them map to job
/// state `failed`.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to launch converter '{program}': {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter reported an error (exit code {code:?}): {line}")]
    ConverterReported { code: Option<i32>, line: String },

    #[error("Converter exited successfully but produced no output")]
    EmptyOutput,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No variants available for item '{0}'")]
    NoVariantsAvailable(ItemId),

    #[error("Variant probe failed: {0}")]
    Conversion(#[from] ConversionError),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to create credential file '{path}': {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write credential file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to inspect credential file '{path}': {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove credential file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cookie file '{name}' must have a .txt extension")]
    InvalidExtension { name: String },

    #[error("Cookie file must be between {min} and {max} bytes, got {size}")]
    InvalidSize { size: u64, min: u64, max: u64 },

    #[error("Cookie file not found: {0}")]
    NotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

/// Synchronous rejections of a dispatch request. Duplicate and in-flight
/// requests are not errors; see `jobs::DispatchOutcome`.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Variant '{variant}' is not available for item '{item_id}' (available: {available:?})")]
    VariantUnavailable {
        item_id: ItemId,
        variant: Variant,
        available: Vec<Variant>,
    },

    #[error("Item '{0}' does not exist")]
    ItemNotFound(ItemId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum DeletionError {
    /// An artifact could not be removed; the whole deletion was rolled back
    /// and needs manual inspection before retrying.
    #[error("Artifact '{path}' could not be removed, deletion rolled back: {source}")]
    PartialArtifactLoss {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Item '{0}' does not exist")]
    ItemNotFound(ItemId),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("No completed artifact for item '{item_id}' variant '{variant}'")]
    NotFound { item_id: ItemId, variant: Variant },

    /// The job is `completed` but its recorded file is gone from disk.
    #[error("Artifact '{path}' for item '{item_id}' variant '{variant}' is missing on disk")]
    ArtifactMissing {
        item_id: ItemId,
        variant: Variant,
        path: PathBuf,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("URL '{0}' is not a supported video link")]
    UnsupportedHost(String),

    #[error("Source item '{0}' was not found upstream")]
    NotFound(ItemId),

    #[error("Metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode metadata response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Metadata API key unavailable: {0}")]
    ApiKey(#[from] SecretError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, MediaconvError>;
