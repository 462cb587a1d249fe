use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const ENV_STORAGE_ROOT: &str = "MEDIACONV_STORAGE_ROOT";
const ENV_DATABASE_PATH: &str = "MEDIACONV_DATABASE_PATH";
const ENV_CONVERTER_PROGRAM: &str = "MEDIACONV_CONVERTER_PROGRAM";
const ENV_WORKER_COUNT: &str = "MEDIACONV_WORKER_COUNT";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_json::from_str(content)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Applies `MEDIACONV_*` environment overrides on top of the file values.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(value) = non_empty_env(ENV_STORAGE_ROOT) {
        config.storage_root = PathBuf::from(value);
    }
    if let Some(value) = non_empty_env(ENV_DATABASE_PATH) {
        config.database_path = PathBuf::from(value);
    }
    if let Some(value) = non_empty_env(ENV_CONVERTER_PROGRAM) {
        config.converter.program = value;
    }
    if let Some(value) = non_empty_env(ENV_WORKER_COUNT) {
        config.worker_count = value.parse().map_err(|_| ConfigError::Validation {
            message: format!("{} must be a positive integer, got '{}'", ENV_WORKER_COUNT, value),
        })?;
    }
    Ok(())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !config.storage_root.is_absolute() {
        return Err(ConfigError::Validation {
            message: format!(
                "storage_root must be an absolute path, got '{}'",
                config.storage_root.display()
            ),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be greater than 0".to_string(),
        });
    }

    if config.converter.program.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "converter.program must not be empty".to_string(),
        });
    }

    Ok(())
}
