//! Graph document types
//!
//! The serialized form of a geo graph: nodes with a geographic coordinate and
//! a kind, and links that refer to nodes by id. This is the input format read
//! by [`crate::io::read_graph`] and resolved by [`crate::Graph::from_data`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Node identifier as it appears in the document (string or integer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Name(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(id) => write!(f, "{id}"),
            NodeId::Name(id) => f.write_str(id),
        }
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        NodeId::Int(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::Name(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId::Name(id)
    }
}

/// Whether a node is pinned to its map location or floats freely
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Held exactly at the projection of its coordinate
    #[serde(alias = "parent")]
    Anchored,
    /// Positioned by the simulated forces
    #[default]
    #[serde(alias = "child")]
    Free,
}

/// A node in the graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoNode {
    /// Unique identifier, referenced by links
    pub id: NodeId,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    #[serde(default, alias = "type")]
    pub kind: NodeKind,

    /// Opaque image reference for the renderer
    #[serde(default, alias = "imageRef", skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,

    /// Collision radius override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl GeoNode {
    /// Create a free node at the given coordinate
    pub fn free(id: impl Into<NodeId>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            kind: NodeKind::Free,
            img: None,
            radius: None,
        }
    }

    /// Create an anchored node at the given coordinate
    pub fn anchored(id: impl Into<NodeId>, lat: f64, lon: f64) -> Self {
        Self {
            kind: NodeKind::Anchored,
            ..Self::free(id, lat, lon)
        }
    }

    /// Set the collision radius
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// A link between two nodes, by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLink {
    #[serde(alias = "source")]
    pub from: NodeId,

    #[serde(alias = "target")]
    pub to: NodeId,
}

impl GeoLink {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Complete graph document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// All nodes, in document order
    pub nodes: Vec<GeoNode>,

    /// All links, in document order
    #[serde(default)]
    pub links: Vec<GeoLink>,
}

impl GraphData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node
    pub fn with_node(mut self, node: GeoNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Append a link
    pub fn with_link(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.links.push(GeoLink::new(from, to));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_with_mixed_ids_and_aliases() {
        let json = r#"{
            "nodes": [
                {"id": 1, "lat": 15.0, "lon": 103.0, "type": "parent", "img": "a.png"},
                {"id": "kid", "lat": 15.1, "lon": 103.1, "kind": "free", "radius": 8}
            ],
            "links": [{"from": 1, "to": "kid"}]
        }"#;
        let data: GraphData = serde_json::from_str(json).expect("Should parse graph document");

        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.nodes[0].id, NodeId::Int(1));
        assert_eq!(data.nodes[0].kind, NodeKind::Anchored);
        assert_eq!(data.nodes[0].img.as_deref(), Some("a.png"));
        assert_eq!(data.nodes[1].id, NodeId::from("kid"));
        assert_eq!(data.nodes[1].radius, Some(8.0));
        assert_eq!(data.links[0], GeoLink::new(1i64, "kid"));
    }

    #[test]
    fn kind_defaults_to_free() {
        let node: GeoNode = serde_json::from_str(r#"{"id": "x", "lat": 0, "lon": 0}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Free);
        assert!(node.radius.is_none());
    }

    #[test]
    fn child_alias_maps_to_free() {
        let node: GeoNode =
            serde_json::from_str(r#"{"id": "x", "lat": 0, "lon": 0, "type": "child"}"#).unwrap();
        assert_eq!(node.kind, NodeKind::Free);
    }

    #[test]
    fn links_default_to_empty() {
        let data: GraphData = serde_json::from_str(r#"{"nodes": []}"#).unwrap();
        assert!(data.links.is_empty());
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::Int(42).to_string(), "42");
        assert_eq!(NodeId::from("hub").to_string(), "hub");
    }
}
