//! Positional forces along one axis

use crate::error::LayoutResult;
use crate::graph::{Graph, Node, Pin};

use super::{Force, ForceContext, check_unit_interval};

/// Default pull strength
pub const DEFAULT_POSITION_STRENGTH: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Target for nodes that are not anchored
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FreeTarget {
    /// The projection of the node's own coordinate
    Home,
    /// A fixed coordinate on the axis
    Value(f64),
    /// Free nodes are not pulled
    Disabled,
}

/// Pulls each node's x (or y) toward a per-node target.
///
/// Anchored nodes target their pin; free nodes follow [`FreeTarget`].
#[derive(Debug, Clone)]
pub struct PositionForce {
    axis: Axis,
    strength: f64,
    free_target: FreeTarget,
}

impl PositionForce {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            strength: DEFAULT_POSITION_STRENGTH,
            free_target: FreeTarget::Home,
        }
    }

    pub fn x() -> Self {
        Self::new(Axis::X)
    }

    pub fn y() -> Self {
        Self::new(Axis::Y)
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn free_target(mut self, target: FreeTarget) -> Self {
        self.free_target = target;
        self
    }

    fn target(&self, node: &Node) -> Option<f64> {
        let point = match node.pin {
            Pin::Anchored { target } => target,
            Pin::Free => match self.free_target {
                FreeTarget::Home => node.home,
                FreeTarget::Value(v) => return Some(v),
                FreeTarget::Disabled => return None,
            },
        };
        Some(match self.axis {
            Axis::X => point.x,
            Axis::Y => point.y,
        })
    }
}

impl Force for PositionForce {
    fn initialize(&mut self, _graph: &Graph) -> LayoutResult<()> {
        let name = match self.axis {
            Axis::X => "x",
            Axis::Y => "y",
        };
        check_unit_interval(name, "strength", self.strength)?;
        if let FreeTarget::Value(v) = self.free_target {
            if !v.is_finite() {
                return Err(crate::error::LayoutError::config(format!(
                    "{name} target must be finite, got {v}"
                )));
            }
        }
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) {
        let k = self.strength * ctx.alpha;
        for node in ctx.nodes.iter_mut() {
            let Some(target) = self.target(node) else {
                continue;
            };
            match self.axis {
                Axis::X => node.vx += (target - node.x) * k,
                Axis::Y => node.vy += (target - node.y) * k,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::test_support::{apply_once, free_graph};
    use crate::geo::{LatLng, Point};
    use crate::graph_types::{GeoNode, GraphData, NodeId};

    #[test]
    fn free_nodes_are_pulled_home() {
        let mut graph = free_graph(&[(0.0, 0.0)]);
        graph.place(&NodeId::Int(0), Point::new(10.0, -10.0)).unwrap();

        apply_once(&mut PositionForce::x(), &mut graph, 1.0);
        apply_once(&mut PositionForce::y(), &mut graph, 1.0);

        let node = &graph.nodes()[0];
        assert!((node.vx + 1.0).abs() < 1e-12);
        assert!((node.vy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fixed_value_target() {
        let mut graph = free_graph(&[(0.0, 0.0)]);
        apply_once(
            &mut PositionForce::x().free_target(FreeTarget::Value(50.0)).strength(0.5),
            &mut graph,
            0.5,
        );
        assert!((graph.nodes()[0].vx - 12.5).abs() < 1e-12);
    }

    #[test]
    fn disabled_target_leaves_free_nodes_alone() {
        let mut graph = free_graph(&[(0.0, 0.0)]);
        graph.place(&NodeId::Int(0), Point::new(10.0, 0.0)).unwrap();
        apply_once(
            &mut PositionForce::x().free_target(FreeTarget::Disabled),
            &mut graph,
            1.0,
        );
        assert_eq!(graph.nodes()[0].vx, 0.0);
    }

    #[test]
    fn anchored_nodes_target_their_pin() {
        let data = GraphData::new().with_node(GeoNode::anchored("p", 40.0, 20.0));
        let identity = |at: LatLng| Point::new(at.lon, at.lat);
        let mut graph = Graph::from_data(&data, &identity).unwrap();
        graph.place(&"p".into(), Point::new(0.0, 0.0)).unwrap();

        apply_once(
            &mut PositionForce::y().free_target(FreeTarget::Disabled),
            &mut graph,
            1.0,
        );
        assert!((graph.nodes()[0].vy - 4.0).abs() < 1e-12);
    }

    #[test]
    fn strength_outside_unit_interval_is_rejected() {
        let graph = free_graph(&[(0.0, 0.0)]);
        assert!(PositionForce::x().strength(1.5).initialize(&graph).is_err());
        assert!(
            PositionForce::y()
                .free_target(FreeTarget::Value(f64::NAN))
                .initialize(&graph)
                .is_err()
        );
    }
}
