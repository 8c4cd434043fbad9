//! Graph model
//!
//! Nodes live in a flat arena; links refer to them by index, resolved once
//! when the graph is built from a [`GraphData`] document.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult, UnresolvedLink};
use crate::geo::{GeoProjector, LatLng, Point};
use crate::graph_types::{GraphData, NodeId, NodeKind};

/// Collision radius used when a node does not set one
pub const DEFAULT_NODE_RADIUS: f64 = 15.0;

/// Radius of the first ring of the seeding spiral
const INITIAL_RADIUS: f64 = 10.0;

/// Whether a node is held at a fixed point or integrated from its velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pin {
    Free,
    Anchored { target: Point },
}

impl Pin {
    /// The fixed point, if any
    pub fn target(&self) -> Option<Point> {
        match self {
            Pin::Free => None,
            Pin::Anchored { target } => Some(*target),
        }
    }
}

/// Classification of a link by the kinds of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkClass {
    AnchorToAnchor,
    AnchorToFree,
    FreeToFree,
}

impl LinkClass {
    pub fn between(a: NodeKind, b: NodeKind) -> Self {
        match (a, b) {
            (NodeKind::Anchored, NodeKind::Anchored) => LinkClass::AnchorToAnchor,
            (NodeKind::Free, NodeKind::Free) => LinkClass::FreeToFree,
            _ => LinkClass::AnchorToFree,
        }
    }
}

/// A node with position and velocity for simulation
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Stored geographic coordinate
    pub geo: LatLng,
    /// Projection of `geo` for the current view
    pub home: Point,
    pub pin: Pin,
    /// Position in layer pixels
    pub x: f64,
    pub y: f64,
    /// Velocity
    pub vx: f64,
    pub vy: f64,
    /// Collision radius
    pub radius: f64,
    /// Opaque image reference, carried for the renderer
    pub image: Option<String>,
}

impl Node {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Point {
        Point::new(self.vx, self.vy)
    }

    pub fn is_anchored(&self) -> bool {
        matches!(self.pin, Pin::Anchored { .. })
    }
}

/// A link between two nodes (indices into the node arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub class: LinkClass,
}

impl Link {
    /// Whether the link has the given node as an endpoint
    pub fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }
}

/// Nodes and resolved links
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    /// Build a graph using [`DEFAULT_NODE_RADIUS`] for nodes without a radius
    pub fn from_data(data: &GraphData, projector: &dyn GeoProjector) -> LayoutResult<Self> {
        Self::from_data_with_radius(data, projector, DEFAULT_NODE_RADIUS)
    }

    /// Build a graph, resolving every link endpoint to a node index.
    ///
    /// Anchored nodes start at their projected coordinate. Free nodes start on
    /// a phyllotaxis spiral around their own projected coordinate, so nodes
    /// that share a coordinate never start on top of each other.
    pub fn from_data_with_radius(
        data: &GraphData,
        projector: &dyn GeoProjector,
        default_radius: f64,
    ) -> LayoutResult<Self> {
        if !(default_radius.is_finite() && default_radius > 0.0) {
            return Err(LayoutError::config(format!(
                "default radius must be positive, got {default_radius}"
            )));
        }

        let mut index = HashMap::with_capacity(data.nodes.len());
        let mut nodes = Vec::with_capacity(data.nodes.len());
        let golden_angle = PI * (3.0 - 5f64.sqrt());

        for (i, input) in data.nodes.iter().enumerate() {
            if index.insert(input.id.clone(), i).is_some() {
                return Err(LayoutError::config(format!(
                    "duplicate node id `{}`",
                    input.id
                )));
            }

            let radius = input.radius.unwrap_or(default_radius);
            if !(radius.is_finite() && radius > 0.0) {
                return Err(LayoutError::config(format!(
                    "node `{}` has invalid radius {radius}",
                    input.id
                )));
            }

            if !(input.lat.is_finite() && input.lon.is_finite()) {
                return Err(LayoutError::config(format!(
                    "node `{}` has non-finite coordinate ({}, {})",
                    input.id, input.lat, input.lon
                )));
            }

            let geo = LatLng::new(input.lat, input.lon);
            let home = projector.project(geo);
            let (pin, start) = match input.kind {
                NodeKind::Anchored => (Pin::Anchored { target: home }, home),
                NodeKind::Free => {
                    let r = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
                    let angle = i as f64 * golden_angle;
                    (
                        Pin::Free,
                        Point::new(home.x + r * angle.cos(), home.y + r * angle.sin()),
                    )
                }
            };

            nodes.push(Node {
                id: input.id.clone(),
                kind: input.kind,
                geo,
                home,
                pin,
                x: start.x,
                y: start.y,
                vx: 0.0,
                vy: 0.0,
                radius,
                image: input.img.clone(),
            });
        }

        let mut links = Vec::with_capacity(data.links.len());
        let mut unresolved = Vec::new();
        for (i, link) in data.links.iter().enumerate() {
            match (index.get(&link.from), index.get(&link.to)) {
                (Some(&source), Some(&target)) => links.push(Link {
                    source,
                    target,
                    class: LinkClass::between(nodes[source].kind, nodes[target].kind),
                }),
                _ => unresolved.push(UnresolvedLink {
                    index: i,
                    from: link.from.clone(),
                    to: link.to.clone(),
                }),
            }
        }

        if !unresolved.is_empty() {
            return Err(LayoutError::Reference { links: unresolved });
        }

        Ok(Self {
            nodes,
            links,
            index,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index(id).map(|i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.node_index(id).map(move |i| &mut self.nodes[i])
    }

    /// Move a node to a point and clear its velocity
    pub fn place(&mut self, id: &NodeId, at: Point) -> LayoutResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| LayoutError::config(format!("unknown node id `{id}`")))?;
        node.x = at.x;
        node.y = at.y;
        node.vx = 0.0;
        node.vy = 0.0;
        Ok(())
    }

    /// Links with the given node as an endpoint
    pub fn links_touching<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a Link> + use<'a> {
        let index = self.node_index(id);
        self.links
            .iter()
            .filter(move |link| index.is_some_and(|i| link.touches(i)))
    }

    /// Closest node to `at`, optionally limited to `max_distance`
    pub fn find(&self, at: Point, max_distance: Option<f64>) -> Option<&Node> {
        let limit = max_distance.unwrap_or(f64::INFINITY);
        self.nodes
            .iter()
            .map(|node| (node.position().distance_to(at), node))
            .filter(|(distance, _)| *distance < limit)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, node)| node)
    }

    /// Current endpoint positions of every link
    pub fn link_segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.links.iter().map(|link| {
            (
                self.nodes[link.source].position(),
                self.nodes[link.target].position(),
            )
        })
    }

    /// Mutable nodes alongside the (immutable) links
    pub(crate) fn parts_mut(&mut self) -> (&mut [Node], &[Link]) {
        (&mut self.nodes, &self.links)
    }

    /// Re-project every node's coordinate and move anchored pins to match.
    ///
    /// With `carry_followers`, each free node linked to at least one anchored
    /// node is translated by the mean displacement of those anchors.
    /// Returns the number of anchored nodes.
    pub(crate) fn reanchor(&mut self, projector: &dyn GeoProjector, carry_followers: bool) -> usize {
        let mut shifts = vec![Point::ORIGIN; self.nodes.len()];
        let mut anchors = 0;

        for (node, shift) in self.nodes.iter_mut().zip(shifts.iter_mut()) {
            let home = projector.project(node.geo);
            if let Pin::Anchored { target } = node.pin {
                *shift = home - target;
                node.pin = Pin::Anchored { target: home };
                anchors += 1;
            }
            node.home = home;
        }

        if carry_followers {
            let mut sums = vec![(Point::ORIGIN, 0usize); self.nodes.len()];
            for link in &self.links {
                for (follower, anchor) in [(link.source, link.target), (link.target, link.source)] {
                    if !self.nodes[follower].is_anchored() && self.nodes[anchor].is_anchored() {
                        let (sum, count) = &mut sums[follower];
                        *sum = *sum + shifts[anchor];
                        *count += 1;
                    }
                }
            }
            for (node, (sum, count)) in self.nodes.iter_mut().zip(sums) {
                if count > 0 {
                    node.x += sum.x / count as f64;
                    node.y += sum.y / count as f64;
                }
            }
        }

        anchors
    }
}
