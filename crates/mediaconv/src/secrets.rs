//! Secret resolution for the metadata API key.
//!
//! A secret may be given inline, in a file (Docker secrets), or through an
//! environment variable. The first non-empty source wins, in that order.

use std::fs;

use secrecy::SecretString;

use crate::config::MetadataConfig;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// The candidate locations of one secret.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretSources<'a> {
    pub direct: Option<&'a str>,
    pub file_path: Option<&'a str>,
    pub env_var: Option<&'a str>,
}

impl<'a> From<&'a MetadataConfig> for SecretSources<'a> {
    fn from(config: &'a MetadataConfig) -> Self {
        Self {
            direct: config.api_key.as_deref(),
            file_path: config.api_key_file.as_deref(),
            env_var: config.api_key_env_var.as_deref(),
        }
    }
}

impl SecretSources<'_> {
    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        if let Some(value) = non_empty(self.direct) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = non_empty(self.file_path) {
            let expanded = expand_home(path);
            return fs::read_to_string(&expanded)
                .map(|content| SecretString::from(content.trim().to_string()))
                .map_err(|source| SecretError::FileRead {
                    path: expanded,
                    source,
                });
        }

        if let Some(name) = non_empty(self.env_var) {
            // Env values may carry a trailing newline.
            return match std::env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided)
    }

    /// Like [`resolve`](Self::resolve), but a missing source yields `None`.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>, SecretError> {
        match self.resolve() {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Expands a leading `~` to the current user's home directory. `~user`
/// forms are left untouched.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
