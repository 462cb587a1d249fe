use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Label of the fixed audio-only variant.
pub const AUDIO_VARIANT: &str = "mp3";

const MAX_VARIANT_LEN: usize = 32;

/// Stable identifier of a media item, derived from its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidItemId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A requested output form: a resolution label such as `720p`, or the
/// fixed audio marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Variant(String);

impl Variant {
    /// Parses a variant label. Surrounding whitespace is trimmed; quotes,
    /// commas and inner whitespace are rejected.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_VARIANT_LEN
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.'));
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidVariant(value.as_ref().to_string()))
        }
    }

    pub fn audio() -> Self {
        Self(AUDIO_VARIANT.to_string())
    }

    pub fn is_audio(&self) -> bool {
        self.0 == AUDIO_VARIANT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()
                    .and_then(|s| Self::new(s).map_err(|e| FromSqlError::Other(Box::new(e))))
            }
        }
    };
}

string_newtype_impls!(ItemId);
string_newtype_impls!(Variant);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_accepts_url_safe_characters() {
        let id = ItemId::new("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        assert!(ItemId::new("a_b-c").is_ok());
    }

    #[test]
    fn test_item_id_rejects_empty_and_separators() {
        assert!(ItemId::new("").is_err());
        assert!(ItemId::new("abc/123").is_err());
        assert!(ItemId::new("abc 123").is_err());
        assert!(ItemId::new("../etc").is_err());
    }

    #[test]
    fn test_variant_trims_whitespace() {
        let v = Variant::new("  720p ").unwrap();
        assert_eq!(v.as_str(), "720p");
    }

    #[test]
    fn test_variant_rejects_quotes_and_commas() {
        assert!(Variant::new("'720p'").is_err());
        assert!(Variant::new("720p,1080p").is_err());
        assert!(Variant::new("").is_err());
        assert!(Variant::new("   ").is_err());
    }

    #[test]
    fn test_audio_variant() {
        let audio = Variant::audio();
        assert!(audio.is_audio());
        assert_eq!(audio.as_str(), AUDIO_VARIANT);
        assert!(!Variant::new("720p").unwrap().is_audio());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let v: Variant = serde_json::from_str("\"1080p\"").unwrap();
        assert_eq!(v.as_str(), "1080p");
        assert!(serde_json::from_str::<ItemId>("\"bad id\"").is_err());
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1080p\"");
    }
}
