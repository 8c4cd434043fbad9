//! Force contributors
//!
//! Each force adds velocity deltas to the nodes it applies to, scaled by the
//! simulation's current alpha. Forces run in registration order once per
//! tick, before integration. The set mirrors d3-force:
//!
//! - [`LinkForce`]: springs between linked nodes, optionally restricted to a
//!   subset of link classes
//! - [`ManyBodyForce`]: charge between all nodes, Barnes-Hut approximated
//! - [`CollideForce`]: overlap resolution between node discs
//! - [`PositionForce`]: pull toward a per-node x or y target
//! - [`CenterForce`]: keep the mean position at a point

mod center;
mod collide;
mod link;
mod many_body;
mod position;
mod quadtree;

pub use center::CenterForce;
pub use collide::CollideForce;
pub use link::{DEFAULT_LINK_DISTANCE, LinkDistance, LinkForce};
pub use many_body::{DEFAULT_CHARGE, DEFAULT_DISTANCE_MIN, DEFAULT_THETA, ManyBodyForce};
pub use position::{Axis, DEFAULT_POSITION_STRENGTH, FreeTarget, PositionForce};

use crate::error::LayoutResult;
use crate::graph::{Graph, Link, Node};

/// LCG parameters (numerical recipes), as used by d3-force
const LCG_A: u32 = 1_664_525;
const LCG_C: u32 = 1_013_904_223;
const LCG_M: f64 = 4_294_967_296.0;

/// Deterministic jitter source for breaking exact coincidences
#[derive(Debug, Clone)]
pub struct Jiggle {
    state: u32,
}

impl Jiggle {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in [0, 1)
    pub fn next_unit(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(LCG_A).wrapping_add(LCG_C);
        f64::from(self.state) / LCG_M
    }

    /// Next jitter in (-0.5e-6, 0.5e-6)
    pub fn next(&mut self) -> f64 {
        (self.next_unit() - 0.5) * 1e-6
    }

    /// Replace an exact zero with a jitter value
    pub(crate) fn nonzero(&mut self, value: f64) -> f64 {
        if value == 0.0 { self.next() } else { value }
    }
}

/// What a force sees during one tick
pub struct ForceContext<'a> {
    pub nodes: &'a mut [Node],
    pub links: &'a [Link],
    pub alpha: f64,
    pub jiggle: &'a mut Jiggle,
}

/// A pluggable rule that accumulates per-node velocity deltas
pub trait Force {
    /// Validate parameters and precompute per-node or per-link values.
    ///
    /// Called once when the force is registered with a simulation.
    fn initialize(&mut self, graph: &Graph) -> LayoutResult<()>;

    /// Apply one tick's worth of force
    fn apply(&mut self, ctx: &mut ForceContext<'_>);
}

pub(crate) fn check_unit_interval(force: &str, param: &str, value: f64) -> LayoutResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(crate::error::LayoutError::config(format!(
            "{force} {param} must be within [0, 1], got {value}"
        )))
    }
}

pub(crate) fn check_positive(force: &str, param: &str, value: f64) -> LayoutResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(crate::error::LayoutError::config(format!(
            "{force} {param} must be positive, got {value}"
        )))
    }
}
