//! Charge (repulsion) between all nodes
//!
//! Uses the Barnes-Hut approximation: a quadtree cell that is small relative
//! to its distance from a node acts as a single charge at its centroid.
//! With `theta = 0` every pair is computed exactly.

use crate::error::{LayoutError, LayoutResult};
use crate::graph::{Graph, Node};

use super::quadtree::QuadTree;
use super::{Force, ForceContext, Jiggle};

/// Default charge per node (negative = repulsion)
pub const DEFAULT_CHARGE: f64 = -30.0;

/// Default Barnes-Hut accuracy threshold (0 = exact)
pub const DEFAULT_THETA: f64 = 0.9;

/// Default minimum distance, avoids the singularity at zero
pub const DEFAULT_DISTANCE_MIN: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct ManyBodyForce {
    strength: f64,
    theta: f64,
    distance_min: f64,
    distance_max: f64,
}

impl Default for ManyBodyForce {
    fn default() -> Self {
        Self::new()
    }
}

impl ManyBodyForce {
    pub fn new() -> Self {
        Self {
            strength: DEFAULT_CHARGE,
            theta: DEFAULT_THETA,
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: f64::INFINITY,
        }
    }

    /// Charge per node; negative repels, positive attracts
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn distance_min(mut self, distance: f64) -> Self {
        self.distance_min = distance;
        self
    }

    /// Ignore pairs farther apart than this
    pub fn distance_max(mut self, distance: f64) -> Self {
        self.distance_max = distance;
        self
    }

    /// Velocity delta on `node` from a charge at offset (`x`, `y`)
    fn pull(&self, x: f64, y: f64, charge: f64, alpha: f64, jiggle: &mut Jiggle) -> (f64, f64) {
        let mut l = x * x + y * y;
        if l >= self.distance_max * self.distance_max {
            return (0.0, 0.0);
        }
        let (mut x, mut y) = (x, y);
        if x == 0.0 {
            x = jiggle.next();
            l += x * x;
        }
        if y == 0.0 {
            y = jiggle.next();
            l += y * y;
        }
        let min2 = self.distance_min * self.distance_min;
        if l < min2 {
            l = (min2 * l).sqrt();
        }
        let w = charge * alpha / l;
        (x * w, y * w)
    }

    fn apply_exact(&self, nodes: &mut [Node], alpha: f64, jiggle: &mut Jiggle) {
        for i in 0..nodes.len() {
            let (mut dvx, mut dvy) = (0.0, 0.0);
            for j in 0..nodes.len() {
                if i == j {
                    continue;
                }
                let x = nodes[j].x - nodes[i].x;
                let y = nodes[j].y - nodes[i].y;
                let (dx, dy) = self.pull(x, y, self.strength, alpha, jiggle);
                dvx += dx;
                dvy += dy;
            }
            nodes[i].vx += dvx;
            nodes[i].vy += dvy;
        }
    }

    fn apply_barnes_hut(&self, nodes: &mut [Node], alpha: f64, jiggle: &mut Jiggle) {
        let points: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
        let charges = vec![self.strength; nodes.len()];
        let tree = QuadTree::build(&points, &charges);
        if tree.root().is_none() {
            return;
        }
        let theta2 = self.theta * self.theta;
        let mut stack = Vec::new();

        for i in 0..nodes.len() {
            let (px, py) = points[i];
            let (mut dvx, mut dvy) = (0.0, 0.0);
            stack.clear();
            stack.push(0);

            while let Some(index) = stack.pop() {
                let cell = tree.cell(index);
                if cell.charge == 0.0 {
                    continue;
                }
                let (x, y) = (cell.cx - px, cell.cy - py);
                let l = x * x + y * y;

                // Far enough away: treat the whole cell as one charge
                if cell.size * cell.size / theta2 < l {
                    let (dx, dy) = self.pull(x, y, cell.charge, alpha, jiggle);
                    dvx += dx;
                    dvy += dy;
                    continue;
                }

                match cell.points() {
                    None => stack.extend(cell.children()),
                    Some(members) => {
                        for &j in members.iter().filter(|&&j| j != i) {
                            let (qx, qy) = points[j];
                            let (dx, dy) = self.pull(qx - px, qy - py, charges[j], alpha, jiggle);
                            dvx += dx;
                            dvy += dy;
                        }
                    }
                }
            }

            nodes[i].vx += dvx;
            nodes[i].vy += dvy;
        }
    }
}

impl Force for ManyBodyForce {
    fn initialize(&mut self, _graph: &Graph) -> LayoutResult<()> {
        if !self.strength.is_finite() {
            return Err(LayoutError::config(format!(
                "many-body strength must be finite, got {}",
                self.strength
            )));
        }
        if !(self.theta.is_finite() && self.theta >= 0.0) {
            return Err(LayoutError::config(format!(
                "many-body theta must be non-negative, got {}",
                self.theta
            )));
        }
        if !(self.distance_min.is_finite() && self.distance_min >= 0.0) {
            return Err(LayoutError::config(format!(
                "many-body distance_min must be non-negative, got {}",
                self.distance_min
            )));
        }
        if !(self.distance_max > self.distance_min) {
            return Err(LayoutError::config(format!(
                "many-body distance_max ({}) must exceed distance_min ({})",
                self.distance_max, self.distance_min
            )));
        }
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) {
        if self.strength == 0.0 || ctx.nodes.len() < 2 {
            return;
        }
        if self.theta == 0.0 {
            self.apply_exact(ctx.nodes, ctx.alpha, ctx.jiggle);
        } else {
            self.apply_barnes_hut(ctx.nodes, ctx.alpha, ctx.jiggle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::test_support::{apply_once, free_graph};

    #[test]
    fn negative_charge_repels() {
        let mut graph = free_graph(&[(0.0, 0.0), (10.0, 0.0)]);
        apply_once(&mut ManyBodyForce::new().theta(0.0), &mut graph, 1.0);

        // -30 * 1 / 100 per unit offset, offset 10
        assert!((graph.nodes()[0].vx + 3.0).abs() < 1e-9);
        assert!((graph.nodes()[1].vx - 3.0).abs() < 1e-9);
    }

    #[test]
    fn positive_charge_attracts() {
        let mut graph = free_graph(&[(0.0, 0.0), (10.0, 0.0)]);
        apply_once(&mut ManyBodyForce::new().strength(30.0), &mut graph, 1.0);
        assert!(graph.nodes()[0].vx > 0.0);
    }

    #[test]
    fn barnes_hut_matches_exact_for_spread_out_nodes() {
        let points: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let a = i as f64 * 2.399;
                let r = 8.0 * (i as f64 + 0.5).sqrt();
                (r * a.cos(), r * a.sin())
            })
            .collect();

        let mut exact = free_graph(&points);
        apply_once(&mut ManyBodyForce::new().theta(0.0), &mut exact, 1.0);
        let mut approx = free_graph(&points);
        apply_once(&mut ManyBodyForce::new().theta(0.5), &mut approx, 1.0);

        for (e, a) in exact.nodes().iter().zip(approx.nodes()) {
            let error = e.velocity().distance_to(a.velocity());
            let scale = e.velocity().distance_to(crate::geo::Point::ORIGIN).max(1e-3);
            assert!(error / scale < 0.1, "relative error {}", error / scale);
        }
    }

    #[test]
    fn distance_max_cuts_off_far_pairs() {
        let mut graph = free_graph(&[(0.0, 0.0), (100.0, 0.0)]);
        apply_once(
            &mut ManyBodyForce::new().theta(0.0).distance_max(50.0),
            &mut graph,
            1.0,
        );
        assert_eq!(graph.nodes()[0].vx, 0.0);
    }

    #[test]
    fn coincident_nodes_get_finite_push() {
        let mut graph = free_graph(&[(3.0, 3.0), (3.0, 3.0)]);
        apply_once(&mut ManyBodyForce::new().theta(0.0), &mut graph, 1.0);
        for node in graph.nodes() {
            assert!(node.vx.is_finite() && node.vy.is_finite());
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let graph = free_graph(&[(0.0, 0.0)]);
        assert!(ManyBodyForce::new().theta(-1.0).initialize(&graph).is_err());
        assert!(
            ManyBodyForce::new()
                .strength(f64::INFINITY)
                .initialize(&graph)
                .is_err()
        );
        assert!(
            ManyBodyForce::new()
                .distance_max(0.5)
                .initialize(&graph)
                .is_err()
        );
    }
}
