//! Force layout engine
//!
//! A [`Simulation`] owns the graph and an ordered list of forces. Each call to
//! [`Simulation::step`] runs one tick:
//!
//! 1. alpha decays toward `alpha_target`
//! 2. every enabled force adds velocity, scaled by alpha
//! 3. free nodes integrate their damped velocity, anchored nodes snap to
//!    their pin
//! 4. the render sink receives the resulting [`Frame`]
//!
//! The engine never reads the map itself. When the view changes the host
//! calls [`Simulation::apply_view_change`] with a projector for the new view.

use std::collections::HashSet;
use std::fmt;

use crate::config::SimulationConfig;
use crate::error::{LayoutError, LayoutResult};
use crate::forces::{Force, ForceContext, Jiggle};
use crate::geo::GeoProjector;
use crate::graph::{Graph, Pin};
use crate::graph_types::GraphData;
use crate::sink::{Frame, FrameSnapshot, NullSink, RenderSink};

/// A force registered under a name, so it can be toggled at runtime
pub struct NamedForce {
    pub name: String,
    pub force: Box<dyn Force>,
    pub enabled: bool,
}

impl NamedForce {
    pub fn new(name: impl Into<String>, force: Box<dyn Force>) -> Self {
        Self {
            name: name.into(),
            force,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Debug for NamedForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedForce")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Step-driven force simulation over a geo graph
pub struct Simulation<S: RenderSink = NullSink> {
    graph: Graph,
    forces: Vec<NamedForce>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    carry_followers: bool,
    jiggle: Jiggle,
    ticks: u64,
    sink: S,
}

impl<S: RenderSink> Simulation<S> {
    /// Create a simulation from a resolved graph and an ordered force list.
    ///
    /// Every force is initialized against the graph here, so invalid force
    /// parameters are reported before the first tick.
    pub fn new(
        graph: Graph,
        mut forces: Vec<NamedForce>,
        config: &SimulationConfig,
        sink: S,
    ) -> LayoutResult<Self> {
        config.validate()?;

        let mut seen = HashSet::new();
        for named in &mut forces {
            if !seen.insert(named.name.clone()) {
                return Err(LayoutError::config(format!(
                    "duplicate force name `{}`",
                    named.name
                )));
            }
            named.force.initialize(&graph)?;
        }

        tracing::debug!(
            nodes = graph.len(),
            links = graph.links().len(),
            forces = forces.len(),
            alpha = config.alpha,
            "created simulation"
        );

        Ok(Self {
            graph,
            forces,
            alpha: config.alpha,
            alpha_min: config.alpha_min,
            alpha_decay: config.effective_alpha_decay(),
            alpha_target: config.alpha_target,
            velocity_decay: config.velocity_decay,
            carry_followers: config.carry_followers,
            jiggle: Jiggle::new(config.seed),
            ticks: 0,
            sink,
        })
    }

    /// Create a simulation with the forces listed in `config`
    pub fn from_config(graph: Graph, config: &SimulationConfig, sink: S) -> LayoutResult<Self> {
        Self::new(graph, config.build_forces(), config, sink)
    }

    /// Resolve a graph document and create a simulation for it
    pub fn from_data(
        data: &GraphData,
        projector: &dyn GeoProjector,
        config: &SimulationConfig,
        sink: S,
    ) -> LayoutResult<Self> {
        let graph = Graph::from_data_with_radius(data, projector, config.default_radius)?;
        Self::from_config(graph, config, sink)
    }

    /// Run one tick and notify the sink. Returns `true` once settled.
    pub fn step(&mut self) -> bool {
        self.advance();
        self.sink
            .on_tick(&Frame::new(self.ticks, self.alpha, &self.graph));
        self.is_settled()
    }

    /// Run `n` ticks without notifying the sink
    pub fn tick(&mut self, n: usize) -> bool {
        for _ in 0..n {
            self.advance();
        }
        self.is_settled()
    }

    /// Step until settled or until `max_ticks` ticks have run.
    ///
    /// Returns the number of ticks run by this call.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while ran < max_ticks && !self.is_settled() {
            self.step();
            ran += 1;
        }
        if self.is_settled() {
            tracing::info!(ticks = self.ticks, alpha = self.alpha, "layout settled");
        } else {
            tracing::debug!(ran, alpha = self.alpha, "tick budget exhausted before settling");
        }
        ran
    }

    fn advance(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        let (nodes, links) = self.graph.parts_mut();
        let mut ctx = ForceContext {
            nodes,
            links,
            alpha: self.alpha,
            jiggle: &mut self.jiggle,
        };
        for named in self.forces.iter_mut().filter(|f| f.enabled) {
            named.force.apply(&mut ctx);
        }

        let (nodes, _) = self.graph.parts_mut();
        for node in nodes.iter_mut() {
            match node.pin {
                Pin::Anchored { target } => {
                    node.x = target.x;
                    node.y = target.y;
                    node.vx = 0.0;
                    node.vy = 0.0;
                }
                Pin::Free => {
                    node.vx *= self.velocity_decay;
                    node.vy *= self.velocity_decay;
                    node.x += node.vx;
                    node.y += node.vy;
                }
            }
        }

        self.ticks += 1;
        tracing::trace!(tick = self.ticks, alpha = self.alpha, "tick");
    }

    /// Set alpha without touching positions or velocities
    pub fn restart(&mut self, alpha: f64) -> LayoutResult<()> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(LayoutError::config(format!(
                "alpha must be non-negative, got {alpha}"
            )));
        }
        tracing::debug!(from = self.alpha, to = alpha, "restarting simulation");
        self.alpha = alpha;
        Ok(())
    }

    /// Re-project every node and move anchored pins to the new projection.
    ///
    /// Should be followed by [`Simulation::restart`] so free nodes relax
    /// around the moved anchors. Returns the number of anchored nodes.
    pub fn reanchor_all(&mut self, projector: &dyn GeoProjector) -> usize {
        let anchors = self.graph.reanchor(projector, self.carry_followers);
        tracing::debug!(
            anchors,
            carry_followers = self.carry_followers,
            "reanchored nodes"
        );
        anchors
    }

    /// Reanchor then restart; the handler for a map zoom or pan ending
    pub fn apply_view_change(&mut self, projector: &dyn GeoProjector, alpha: f64) -> LayoutResult<()> {
        self.reanchor_all(projector);
        self.restart(alpha)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Ticks run since creation
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current layout, as a sink would see it after the last tick
    pub fn snapshot(&self) -> FrameSnapshot {
        Frame::new(self.ticks, self.alpha, &self.graph).snapshot()
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.alpha_min
    }

    pub fn set_alpha_target(&mut self, target: f64) -> LayoutResult<()> {
        if !(0.0..=1.0).contains(&target) {
            return Err(LayoutError::config(format!(
                "alpha_target must be within [0, 1], got {target}"
            )));
        }
        self.alpha_target = target;
        Ok(())
    }

    /// Enable or disable a force by name
    pub fn set_force_enabled(&mut self, name: &str, enabled: bool) -> LayoutResult<()> {
        let named = self
            .forces
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| LayoutError::config(format!("unknown force `{name}`")))?;
        named.enabled = enabled;
        Ok(())
    }

    /// Registered force names, in application order
    pub fn force_names(&self) -> impl Iterator<Item = &str> {
        self.forces.iter().map(|f| f.name.as_str())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (Graph, S) {
        (self.graph, self.sink)
    }
}
