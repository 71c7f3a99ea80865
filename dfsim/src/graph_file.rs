//! Loading of graph description files.
//!
//! A graph file is a YAML or JSON document with a `nodes` list and an `edges`
//! list:
//!
//! ```yaml
//! nodes:
//!   - { id: src, kind: s, host: h1, count: 5, interval: 1 }
//!   - { id: A, kind: q, host: h1, capacity: 10 }
//!   - { id: cal, host: h1, action: nop, delay: 1 }
//!   - { id: B, kind: t, host: h1, summarize: true }
//! edges:
//!   - { from: src, to: A }
//!   - { from: A, to: cal }
//!   - { from: cal, to: B }
//! ```
//!
//! Nodes which name a transformation (`action` or `action_name`) but declare
//! no kind are loaded as actions.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::graph::Graph;
use crate::util::document::DocumentFormat;

/// Loads a graph description from a YAML or JSON file.
///
/// The format is selected from the file extension (`.json` for JSON, YAML
/// otherwise).
pub fn load(path: impl AsRef<Path>) -> Result<Graph, GraphFileError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| GraphFileError::Io {
        path: path.to_owned(),
        source,
    })?;

    let mut graph: Graph = match DocumentFormat::from_path(path) {
        DocumentFormat::Json => {
            serde_json::from_str(&content).map_err(|source| GraphFileError::Json {
                path: path.to_owned(),
                source,
            })?
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(&content).map_err(|source| GraphFileError::Yaml {
                path: path.to_owned(),
                source,
            })?
        }
    };
    graph.infer_kinds();

    info!(
        path = %path.display(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph loaded"
    );

    Ok(graph)
}

/// An error returned when a graph file cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum GraphFileError {
    /// The file could not be read.
    #[error("could not read graph file {}", path.display())]
    Io {
        /// Path to the graph file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not a valid YAML graph description.
    #[error("malformed YAML graph file {}", path.display())]
    Yaml {
        /// Path to the graph file.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },
    /// The file is not a valid JSON graph description.
    #[error("malformed JSON graph file {}", path.display())]
    Json {
        /// Path to the graph file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}
