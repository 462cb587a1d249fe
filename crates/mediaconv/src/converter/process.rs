//! [`ConverterInvoker`] backed by an OS process.

use std::process::{Command, Output, Stdio};

use crate::config::ConverterConfig;
use crate::error::ConversionError;
use crate::sanitize::redact_path;

use super::{ConverterInvoker, Invocation};

/// Launches `program args... <invocation arguments>` and reads the last
/// non-empty stdout line as the result.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    program: String,
    leading_args: Vec<String>,
}

impl ProcessConverter {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ConverterInvoker for ProcessConverter {
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<String, ConversionError> {
        let _span = tracing::debug_span!(
            "converter",
            item_id = %invocation.item_id,
            mode = ?invocation.mode,
        )
        .entered();

        log::debug!(
            "Running converter {} for {} (cookies: {})",
            self.program,
            invocation.item_id,
            invocation
                .credential_path
                .map(redact_path)
                .unwrap_or_else(|| "none".to_string()),
        );

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ConversionError::ProcessLaunch {
                program: self.program.clone(),
                source: e,
            })?;

        classify_output(&output)
    }
}

/// Last non-empty line of `stdout`, trimmed.
pub fn last_line(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
}

fn classify_output(output: &Output) -> Result<String, ConversionError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = last_line(&stdout).map(str::to_string);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("Converter stderr: {}", stderr.trim());
        }
        return Err(ConversionError::ConverterReported {
            code: output.status.code(),
            line: line.unwrap_or_default(),
        });
    }

    classify_line(line)
}

/// Applies the success-path rules to a result line: missing means empty
/// output, any case-insensitive "error" means the converter failed.
pub fn classify_line(line: Option<String>) -> Result<String, ConversionError> {
    match line {
        None => Err(ConversionError::EmptyOutput),
        Some(line) if line.to_ascii_lowercase().contains("error") => {
            Err(ConversionError::ConverterReported { code: Some(0), line })
        }
        Some(line) => Ok(line),
    }
}
