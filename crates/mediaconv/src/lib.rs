pub mod config;
pub mod converter;
pub mod credentials;
pub mod db;
pub mod error;
pub mod jobs;
pub mod model;
pub mod sanitize;
pub mod secrets;
pub mod source;
pub mod worker;

pub use config::{load_config, Config};
pub use converter::{ConverterInvoker, ProcessConverter, VariantCatalog};
pub use credentials::{CookieStore, CredentialPayload, CredentialStager, StagedCredential};
pub use db::Database;
pub use error::{
    CatalogError, ConversionError, DeletionError, DispatchError, LookupError, MediaconvError,
    Result, SourceError,
};
pub use jobs::{delete_item, locate_artifact, DispatchOutcome, Dispatcher};
pub use model::{ItemId, JobState, Variant};
pub use source::{parse_source_url, register_item, Registration};
