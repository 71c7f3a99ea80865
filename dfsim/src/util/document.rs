//! Format detection for configuration and graph documents.

use std::path::Path;

/// The serialization format of a document.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Infers the format from the file extension, defaulting to YAML.
    pub(crate) fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}
