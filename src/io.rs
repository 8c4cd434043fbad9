//! Document loading and writing
//!
//! Graph documents and layout configs are JSON or YAML; the format is picked
//! from the file extension, case-insensitively.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::SimulationConfig;
use crate::error::{LayoutError, LayoutResult};
use crate::graph_types::GraphData;

/// Serialization format of an input or output document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// File extensions for this format
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Json => &["json"],
            DocumentFormat::Yaml => &["yaml", "yml"],
        }
    }

    pub fn supports_extension(self, ext: &str) -> bool {
        self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Get file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Pick the format for a path based on its extension
    pub fn from_path(path: &Path) -> LayoutResult<Self> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| LayoutError::UnknownExtension(path.display().to_string()))?;

        [DocumentFormat::Json, DocumentFormat::Yaml]
            .into_iter()
            .find(|f| f.supports_extension(ext))
            .ok_or_else(|| LayoutError::UnsupportedFormat(ext.to_string()))
    }

    /// Parse a document from a string
    pub fn parse<T: DeserializeOwned>(self, source: &str) -> LayoutResult<T> {
        match self {
            DocumentFormat::Json => {
                serde_json::from_str(source).map_err(|e| LayoutError::Parse(e.to_string()))
            }
            DocumentFormat::Yaml => {
                serde_yaml::from_str(source).map_err(|e| LayoutError::Parse(e.to_string()))
            }
        }
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> LayoutResult<T> {
    let format = DocumentFormat::from_path(path)?;
    let source = fs::read_to_string(path)?;
    format.parse(&source).map_err(|e| match e {
        LayoutError::Parse(msg) => LayoutError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Read a graph document
pub fn read_graph(path: &Path) -> LayoutResult<GraphData> {
    let data: GraphData = read_document(path)?;
    tracing::debug!(
        path = %path.display(),
        nodes = data.nodes.len(),
        links = data.links.len(),
        "read graph document"
    );
    Ok(data)
}

/// Read a layout config; the built-in defaults apply when `path` is `None`
pub fn read_config(path: Option<&Path>) -> LayoutResult<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let config: SimulationConfig = read_document(path)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), forces = config.forces.len(), "read layout config");
    Ok(config)
}

/// Write a value as pretty-printed JSON
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> LayoutResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| LayoutError::Parse(e.to_string()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
