//! Variant Catalog Resolver.
//!
//! Asks the converter which variants exist for an item. The probe's result
//! line is a bracketed, quoted, comma-separated list such as
//! `['360p', '720p']`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::model::{ItemId, Variant};

use super::{ConverterInvoker, Invocation, InvokeMode};

#[derive(Clone)]
pub struct VariantCatalog {
    invoker: Arc<dyn ConverterInvoker>,
    storage_root: PathBuf,
}

impl VariantCatalog {
    pub fn new(invoker: Arc<dyn ConverterInvoker>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            invoker,
            storage_root: storage_root.into(),
        }
    }

    /// Lists the variants the converter can currently produce for
    /// `item_id`. Never caches; every call probes.
    pub fn list_variants(
        &self,
        item_id: &ItemId,
        credential_path: Option<&Path>,
    ) -> Result<Vec<Variant>, CatalogError> {
        let line = self.invoker.invoke(&Invocation {
            item_id,
            mode: InvokeMode::ProbeVariants,
            storage_root: &self.storage_root,
            credential_path,
        })?;

        let variants = parse_variant_list(&line);
        if variants.is_empty() {
            return Err(CatalogError::NoVariantsAvailable(item_id.clone()));
        }

        log::debug!("Variants for {}: {:?}", item_id, variants);
        Ok(variants)
    }
}

/// Parses `['360p', "720p", 1080p]` into variants, keeping first-seen order
/// and dropping duplicates. Labels that fail validation are skipped.
pub fn parse_variant_list(line: &str) -> Vec<Variant> {
    let inner = line.trim().trim_start_matches('[').trim_end_matches(']');

    let mut variants: Vec<Variant> = Vec::new();
    for raw in inner.split(',') {
        let label = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        if label.is_empty() {
            continue;
        }
        match Variant::new(label) {
            Ok(variant) if !variants.contains(&variant) => variants.push(variant),
            Ok(_) => {}
            Err(e) => log::warn!("Ignoring unparseable variant from converter: {}", e),
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;

    fn labels(variants: &[Variant]) -> Vec<&str> {
        variants.iter().map(Variant::as_str).collect()
    }

    #[test]
    fn test_parse_python_style_list() {
        let variants = parse_variant_list("['360p', '720p']");
        assert_eq!(labels(&variants), vec!["360p", "720p"]);
    }

    #[test]
    fn test_parse_handles_double_quotes_and_duplicates() {
        let variants = parse_variant_list(r#"["1080p","720p", "1080p"]"#);
        assert_eq!(labels(&variants), vec!["1080p", "720p"]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_variant_list("[]").is_empty());
        assert!(parse_variant_list("").is_empty());
    }

    struct Probe(Result<&'static str, ()>);

    impl ConverterInvoker for Probe {
        fn invoke(&self, invocation: &Invocation<'_>) -> Result<String, ConversionError> {
            assert!(matches!(invocation.mode, InvokeMode::ProbeVariants));
            match self.0 {
                Ok(line) => Ok(line.to_string()),
                Err(()) => Err(ConversionError::EmptyOutput),
            }
        }
    }

    #[test]
    fn test_list_variants_empty_is_error() {
        let catalog = VariantCatalog::new(Arc::new(Probe(Ok("[]"))), "/store");
        let item = ItemId::new("abc123").unwrap();
        assert!(matches!(
            catalog.list_variants(&item, None),
            Err(CatalogError::NoVariantsAvailable(_))
        ));
    }

    #[test]
    fn test_list_variants_propagates_probe_failure() {
        let catalog = VariantCatalog::new(Arc::new(Probe(Err(()))), "/store");
        let item = ItemId::new("abc123").unwrap();
        assert!(matches!(
            catalog.list_variants(&item, None),
            Err(CatalogError::Conversion(ConversionError::EmptyOutput))
        ));
    }

    #[test]
    fn test_list_variants_success() {
        let catalog = VariantCatalog::new(Arc::new(Probe(Ok("['360p', '720p']"))), "/store");
        let item = ItemId::new("abc123").unwrap();
        let variants = catalog.list_variants(&item, None).unwrap();
        assert_eq!(labels(&variants), vec!["360p", "720p"]);
    }
}
