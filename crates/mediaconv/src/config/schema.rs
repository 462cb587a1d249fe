use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory the converter writes artifacts into.
    pub storage_root: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path().unwrap_or_else(|| PathBuf::from("mediaconv.db"))
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

/// How the external converter is launched: `program args... <converter arguments>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Leading arguments, typically the converter script path.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "/usr/bin/python3".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Directory for per-request credential files. Defaults to the system
    /// temp directory.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    /// Location of the administrator-managed cookie bundle.
    #[serde(default)]
    pub stored_cookies_path: Option<PathBuf>,
}

impl CredentialsConfig {
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
}

fn default_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("GOOGLE_CLOUD_API_KEY".to_string())
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_api_key_env_var(),
        }
    }
}
