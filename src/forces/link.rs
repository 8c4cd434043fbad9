//! Spring force between linked nodes

use std::collections::HashSet;

use crate::error::{LayoutError, LayoutResult};
use crate::graph::{Graph, LinkClass};

use super::{Force, ForceContext, check_positive};

/// Default rest length of a link
pub const DEFAULT_LINK_DISTANCE: f64 = 30.0;

/// Rest length of a link
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkDistance {
    /// The same distance for every link
    Fixed(f64),
    /// Sum of the endpoint radii, times `scale`
    RadiusSum { scale: f64 },
}

/// Hooke's-law spring between the endpoints of each selected link.
///
/// A link force can be limited to some [`LinkClass`]es, so that links
/// between anchored nodes and links to free nodes get independent
/// parameters.
#[derive(Debug, Clone)]
pub struct LinkForce {
    classes: Option<HashSet<LinkClass>>,
    distance: LinkDistance,
    strength: Option<f64>,
    iterations: usize,
    // Per selected link, filled by `initialize`
    selected: Vec<usize>,
    distances: Vec<f64>,
    strengths: Vec<f64>,
    bias: Vec<f64>,
}

impl Default for LinkForce {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkForce {
    pub fn new() -> Self {
        Self {
            classes: None,
            distance: LinkDistance::Fixed(DEFAULT_LINK_DISTANCE),
            strength: None,
            iterations: 1,
            selected: Vec::new(),
            distances: Vec::new(),
            strengths: Vec::new(),
            bias: Vec::new(),
        }
    }

    /// Only act on links of these classes
    pub fn only(mut self, classes: impl IntoIterator<Item = LinkClass>) -> Self {
        self.classes = Some(classes.into_iter().collect());
        self
    }

    pub fn distance(mut self, distance: f64) -> Self {
        self.distance = LinkDistance::Fixed(distance);
        self
    }

    pub fn distance_from_radii(mut self, scale: f64) -> Self {
        self.distance = LinkDistance::RadiusSum { scale };
        self
    }

    /// Spring constant for every link.
    ///
    /// When unset, each link gets `1 / min(degree(source), degree(target))`,
    /// which keeps hubs from being pulled around by their many links.
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    fn selects(&self, class: LinkClass) -> bool {
        self.classes.as_ref().is_none_or(|c| c.contains(&class))
    }
}

impl Force for LinkForce {
    fn initialize(&mut self, graph: &Graph) -> LayoutResult<()> {
        if self.iterations == 0 {
            return Err(LayoutError::config("link iterations must be at least 1"));
        }
        match self.distance {
            LinkDistance::Fixed(d) if !(d.is_finite() && d >= 0.0) => {
                return Err(LayoutError::config(format!(
                    "link distance must be non-negative, got {d}"
                )));
            }
            LinkDistance::RadiusSum { scale } => check_positive("link", "radius scale", scale)?,
            LinkDistance::Fixed(_) => {}
        }
        if let Some(s) = self.strength {
            if !(s.is_finite() && s >= 0.0) {
                return Err(LayoutError::config(format!(
                    "link strength must be non-negative, got {s}"
                )));
            }
        }

        let links = graph.links();
        let nodes = graph.nodes();
        self.selected = (0..links.len())
            .filter(|&i| self.selects(links[i].class))
            .collect();

        let mut degree = vec![0usize; nodes.len()];
        for &i in &self.selected {
            degree[links[i].source] += 1;
            degree[links[i].target] += 1;
        }

        self.distances.clear();
        self.strengths.clear();
        self.bias.clear();
        for &i in &self.selected {
            let link = links[i];
            let (ds, dt) = (degree[link.source] as f64, degree[link.target] as f64);
            self.bias.push(ds / (ds + dt));
            self.strengths
                .push(self.strength.unwrap_or_else(|| 1.0 / ds.min(dt)));
            self.distances.push(match self.distance {
                LinkDistance::Fixed(d) => d,
                LinkDistance::RadiusSum { scale } => {
                    (nodes[link.source].radius + nodes[link.target].radius) * scale
                }
            });
        }
        Ok(())
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) {
        for _ in 0..self.iterations {
            for (k, &i) in self.selected.iter().enumerate() {
                let link = ctx.links[i];
                let (s, t) = (&ctx.nodes[link.source], &ctx.nodes[link.target]);

                let x = ctx.jiggle.nonzero(t.x + t.vx - s.x - s.vx);
                let y = ctx.jiggle.nonzero(t.y + t.vy - s.y - s.vy);
                let l = (x * x + y * y).sqrt();
                let l = (l - self.distances[k]) / l * ctx.alpha * self.strengths[k];
                let (x, y) = (x * l, y * l);

                let b = self.bias[k];
                let target = &mut ctx.nodes[link.target];
                target.vx -= x * b;
                target.vy -= y * b;
                let source = &mut ctx.nodes[link.source];
                source.vx += x * (1.0 - b);
                source.vy += y * (1.0 - b);
            }
        }
    }
}
