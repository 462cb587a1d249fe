//! The external converter behind a narrow contract.
//!
//! A converter invocation either yields its authoritative result line (the
//! last non-empty line of its standard output) or a classified
//! [`ConversionError`]. How that line is obtained is an implementation
//! detail of [`ConverterInvoker`]; the dispatcher only sees paths and
//! variant lists.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConversionError;
use crate::model::{ItemId, Variant};

pub mod catalog;
pub mod process;

pub use catalog::{parse_variant_list, VariantCatalog};
pub use process::ProcessConverter;

/// What the converter is asked to do.
#[derive(Debug, Clone, Copy)]
pub enum InvokeMode<'a> {
    /// List the variants available for the item.
    ProbeVariants,
    /// Produce the given variant. The audio marker selects audio mode.
    Convert(&'a Variant),
}

/// A single converter call.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub item_id: &'a ItemId,
    pub mode: InvokeMode<'a>,
    pub storage_root: &'a Path,
    pub credential_path: Option<&'a Path>,
}

impl Invocation<'_> {
    /// Builds the converter's argument list:
    /// `<item> video|audio <storage_root> [--resolution <v>] [--cookies <path>]`.
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.item_id.as_str().into()];

        match self.mode {
            InvokeMode::ProbeVariants => {
                args.push("video".into());
                args.push(self.storage_root.into());
            }
            InvokeMode::Convert(variant) if variant.is_audio() => {
                args.push("audio".into());
                args.push(self.storage_root.into());
            }
            InvokeMode::Convert(variant) => {
                args.push("video".into());
                args.push(self.storage_root.into());
                args.push("--resolution".into());
                args.push(variant.as_str().into());
            }
        }

        if let Some(path) = self.credential_path {
            args.push("--cookies".into());
            args.push(path.into());
        }

        args
    }
}

/// Runs the external converter.
pub trait ConverterInvoker: Send + Sync {
    /// Runs one invocation and returns its authoritative result line.
    ///
    /// Implementations must already have classified failures: an `Ok` line
    /// never signals an error.
    fn invoke(&self, invocation: &Invocation<'_>) -> Result<String, ConversionError>;

    /// Converts `item_id` into `variant` and returns the artifact path.
    fn convert(
        &self,
        item_id: &ItemId,
        variant: &Variant,
        storage_root: &Path,
        credential_path: Option<&Path>,
    ) -> Result<PathBuf, ConversionError> {
        let line = self.invoke(&Invocation {
            item_id,
            mode: InvokeMode::Convert(variant),
            storage_root,
            credential_path,
        })?;
        Ok(PathBuf::from(line.trim()))
    }
}
