//! Overlap resolution between node discs

use crate::error::{LayoutError, LayoutResult};
use crate::graph::{Graph, Node};

use super::quadtree::QuadTree;
use super::{Force, ForceContext, Jiggle, check_positive, check_unit_interval};

/// Pushes apart nodes whose discs overlap.
///
/// Each node is a disc of `radius * radius_scale`. Overlap is measured on the
/// positions the nodes are about to move to (position plus velocity), and
/// each pair is separated in proportion to the other node's area, so small
/// nodes give way to large ones. Resolving one pair can create overlap
/// elsewhere, hence `iterations` passes per tick. Each pass indexes the
/// predicted positions in a quadtree and only compares nodes in cells within
/// reach of each other.
#[derive(Debug, Clone)]
pub struct CollideForce {
    radius_scale: f64,
    strength: f64,
    iterations: usize,
    radii: Vec<f64>,
}

impl Default for CollideForce {
    fn default() -> Self {
        Self::new()
    }
}

impl CollideForce {
    pub fn new() -> Self {
        Self {
            radius_scale: 1.0,
            strength: 1.0,
            iterations: 1,
            radii: Vec::new(),
        }
    }

    /// Padding multiplier applied to every node radius
    pub fn radius_scale(mut self, scale: f64) -> Self {
        self.radius_scale = scale;
        self
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

impl Force for CollideForce {
    fn initialize(&mut self, graph: &Graph) -> LayoutResult<()> {
        check_positive("collide", "radius_scale", self.radius_scale)?;
        check_unit_interval("collide", "strength", self.strength)?;
        if self.iterations == 0 {
            return Err(LayoutError::config("collide iterations must be at least 1"));
        }
        self.radii = graph
            .nodes()
            .iter()
            .map(|n| n.radius * self.radius_scale)
            .collect();
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) {
        let n = ctx.nodes.len();
        if n < 2 {
            return;
        }
        let max_radius = self.radii.iter().copied().fold(0.0, f64::max);
        let mut pending = Vec::new();

        for _ in 0..self.iterations {
            let predicted: Vec<(f64, f64)> = ctx
                .nodes
                .iter()
                .map(|node| (node.x + node.vx, node.y + node.vy))
                .collect();
            let tree = QuadTree::index(&predicted);

            for i in 0..n {
                let xi = ctx.nodes[i].x + ctx.nodes[i].vx;
                let yi = ctx.nodes[i].y + ctx.nodes[i].vy;
                let reach = self.radii[i] + max_radius;

                pending.clear();
                pending.push(0);
                while let Some(index) = pending.pop() {
                    let cell = tree.cell(index);
                    if !cell.near(xi, yi, reach) {
                        continue;
                    }
                    match cell.points() {
                        Some(points) => {
                            for &j in points.iter().filter(|&&j| j > i) {
                                self.separate(ctx.nodes, ctx.jiggle, i, j, (xi, yi));
                            }
                        }
                        None => pending.extend(cell.children()),
                    }
                }
            }
        }
    }
}

impl CollideForce {
    /// Push `i` (at predicted `at`) and `j` apart if their discs overlap
    fn separate(
        &self,
        nodes: &mut [Node],
        jiggle: &mut Jiggle,
        i: usize,
        j: usize,
        at: (f64, f64),
    ) {
        let (ri, rj) = (self.radii[i], self.radii[j]);
        let r = ri + rj;
        let mut x = at.0 - nodes[j].x - nodes[j].vx;
        let mut y = at.1 - nodes[j].y - nodes[j].vy;
        let mut l = x * x + y * y;
        if l >= r * r {
            return;
        }

        if x == 0.0 {
            x = jiggle.next();
            l += x * x;
        }
        if y == 0.0 {
            y = jiggle.next();
            l += y * y;
        }
        let l = l.sqrt();
        let push = (r - l) / l * self.strength;
        let (x, y) = (x * push, y * push);

        let share = rj * rj / (ri * ri + rj * rj);
        nodes[i].vx += x * share;
        nodes[i].vy += y * share;
        nodes[j].vx -= x * (1.0 - share);
        nodes[j].vy -= y * (1.0 - share);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::test_support::{apply_once, free_graph};

    #[test]
    fn overlapping_nodes_are_pushed_to_touching() {
        // Default radius 15 each, 10 apart: 20 px of overlap
        let mut graph = free_graph(&[(0.0, 0.0), (10.0, 0.0)]);
        apply_once(&mut CollideForce::new(), &mut graph, 1.0);

        let (a, b) = (&graph.nodes()[0], &graph.nodes()[1]);
        assert!((a.vx + 10.0).abs() < 1e-9);
        assert!((b.vx - 10.0).abs() < 1e-9);
    }

    #[test]
    fn separated_nodes_are_untouched() {
        let mut graph = free_graph(&[(0.0, 0.0), (31.0, 0.0)]);
        apply_once(&mut CollideForce::new(), &mut graph, 1.0);
        assert_eq!(graph.nodes()[0].velocity(), crate::geo::Point::ORIGIN);
    }

    #[test]
    fn radius_scale_pads_the_discs() {
        let mut graph = free_graph(&[(0.0, 0.0), (31.0, 0.0)]);
        apply_once(&mut CollideForce::new().radius_scale(1.5), &mut graph, 1.0);
        assert!(graph.nodes()[0].vx < 0.0);
    }

    #[test]
    fn ignores_alpha() {
        let mut graph = free_graph(&[(0.0, 0.0), (10.0, 0.0)]);
        apply_once(&mut CollideForce::new(), &mut graph, 0.0);
        assert!(graph.nodes()[0].vx < 0.0);
    }

    #[test]
    fn coincident_nodes_are_separated() {
        let mut graph = free_graph(&[(0.0, 0.0), (0.0, 0.0)]);
        apply_once(&mut CollideForce::new(), &mut graph, 1.0);

        let (a, b) = (&graph.nodes()[0], &graph.nodes()[1]);
        let gap = a.velocity().distance_to(b.velocity());
        assert!((gap - 30.0).abs() < 1e-5);
    }

    /// Summed pairwise overlap of the predicted discs (radius 15)
    fn overlap(graph: &Graph) -> f64 {
        let predicted: Vec<_> = graph
            .nodes()
            .iter()
            .map(|n| n.position() + n.velocity())
            .collect();
        let mut total = 0.0;
        for (i, a) in predicted.iter().enumerate() {
            for b in &predicted[i + 1..] {
                total += (30.0 - a.distance_to(*b)).max(0.0);
            }
        }
        total
    }

    #[test]
    fn extra_iterations_resolve_chained_overlap() {
        // Separating the middle disc from its right neighbour pushes it back
        // into the left one
        let chain = [(0.0, 0.0), (20.0, 0.0), (40.0, 0.0)];

        let mut once = free_graph(&chain);
        apply_once(&mut CollideForce::new(), &mut once, 1.0);
        let mut thrice = free_graph(&chain);
        apply_once(&mut CollideForce::new().iterations(3), &mut thrice, 1.0);

        assert!((overlap(&once) - 7.5).abs() < 1e-9, "{}", overlap(&once));
        assert!(overlap(&thrice) < overlap(&once) / 4.0);
    }

    #[test]
    fn separate_clusters_resolve_independently() {
        let mut graph = free_graph(&[(0.0, 0.0), (10.0, 0.0), (500.0, 500.0), (510.0, 500.0)]);
        apply_once(&mut CollideForce::new(), &mut graph, 1.0);

        let nodes = graph.nodes();
        for (node, expected) in nodes.iter().zip([-10.0, 10.0, -10.0, 10.0]) {
            assert!((node.vx - expected).abs() < 1e-9, "{} vx {}", node.id, node.vx);
            assert!(node.vy.abs() < 1e-6);
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let graph = free_graph(&[(0.0, 0.0)]);
        assert!(CollideForce::new().radius_scale(-1.0).initialize(&graph).is_err());
        assert!(CollideForce::new().strength(2.0).initialize(&graph).is_err());
        assert!(CollideForce::new().iterations(0).initialize(&graph).is_err());
    }
}
