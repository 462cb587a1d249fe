//! Helpers for sanitizing data before it enters log lines and span fields.
//!
//! Credential file locations and API keys must never be logged verbatim.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks the value of a query parameter in a URL.
///
/// - `https://host/videos?id=x&key=SECRET` → `https://host/videos?id=x&key=****`
/// - URLs without the parameter are returned unchanged.
pub fn redact_query_param(url: &str, name: &str) -> String {
    let Some(query_start) = url.find('?') else {
        return url.to_string();
    };
    let (base, query) = url.split_at(query_start + 1);
    let prefix = format!("{}=", name);
    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| {
            if pair.starts_with(&prefix) {
                format!("{}****", prefix)
            } else {
                pair.to_string()
            }
        })
        .collect();
    format!("{}{}", base, redacted.join("&"))
}
