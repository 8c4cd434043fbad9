//! Centering force

use crate::error::LayoutResult;
use crate::geo::Point;
use crate::graph::Graph;

use super::{Force, ForceContext, check_unit_interval};

/// Translates all nodes so that their mean position moves toward `center`.
///
/// Acts on positions directly and does not depend on alpha.
#[derive(Debug, Clone)]
pub struct CenterForce {
    center: Point,
    strength: f64,
}

impl CenterForce {
    pub fn new(center: Point) -> Self {
        Self {
            center,
            strength: 1.0,
        }
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }
}

impl Force for CenterForce {
    fn initialize(&mut self, _graph: &Graph) -> LayoutResult<()> {
        check_unit_interval("center", "strength", self.strength)
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) {
        if ctx.nodes.is_empty() {
            return;
        }
        let n = ctx.nodes.len() as f64;
        let (sx, sy) = ctx
            .nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
        let dx = (sx / n - self.center.x) * self.strength;
        let dy = (sy / n - self.center.y) * self.strength;
        for node in ctx.nodes.iter_mut() {
            node.x -= dx;
            node.y -= dy;
        }
    }
}
