//! Error types shared by the graph model, the engine and the loaders

use std::fmt;

use thiserror::Error;

use crate::graph_types::NodeId;

/// A link whose endpoint ids could not be resolved to nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLink {
    /// Position of the link in the input document
    pub index: usize,
    pub from: NodeId,
    pub to: NodeId,
}

impl fmt::Display for UnresolvedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link #{} ({} -> {})", self.index, self.from, self.to)
    }
}

fn join_links(links: &[UnresolvedLink]) -> String {
    links
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while building or driving a layout
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Invalid force parameter, engine scalar or node attribute
    #[error("configuration error: {0}")]
    Configuration(String),

    /// One or more links reference node ids that do not exist
    #[error("unresolved link endpoints: {}", join_links(.links))]
    Reference { links: Vec<UnresolvedLink> },

    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),
}

impl LayoutError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        LayoutError::Configuration(message.into())
    }
}

/// Result type for layout operations
pub type LayoutResult<T> = Result<T, LayoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_error_lists_every_link() {
        let err = LayoutError::Reference {
            links: vec![
                UnresolvedLink {
                    index: 1,
                    from: NodeId::from("a"),
                    to: NodeId::from("ghost"),
                },
                UnresolvedLink {
                    index: 4,
                    from: NodeId::Int(7),
                    to: NodeId::from("a"),
                },
            ],
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"unresolved link endpoints: link #1 (a -> ghost), link #4 (7 -> a)"
        );
    }

    #[test]
    fn layout_error_display() {
        let err = LayoutError::UnsupportedFormat("xyz".to_string());
        assert_eq!(err.to_string(), "unsupported format: xyz");

        let err = LayoutError::config("collide radius_scale must be positive, got -1");
        assert_eq!(
            err.to_string(),
            "configuration error: collide radius_scale must be positive, got -1"
        );
    }
}
