use std::path::PathBuf;

use thiserror::Error;

use mediaconv::error::{ConfigError, CredentialError, ValidationError, WorkerError};
use mediaconv::{
    db::DatabaseError, CatalogError, DeletionError, DispatchError, LookupError, SourceError,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Deletion(#[from] DeletionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

pub type Result<T> = std::result::Result<T, CliError>;
