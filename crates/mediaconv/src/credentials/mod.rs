//! Credential material handed to the converter as `--cookies`.
//!
//! Two kinds exist: ephemeral per-request files created by [`staging`], and
//! the administrator-managed bundle kept by [`stored`].

pub mod staging;
pub mod stored;

pub use staging::{CredentialPayload, CredentialStager, StagedCredential};
pub use stored::{CookieInfo, CookieStore};
