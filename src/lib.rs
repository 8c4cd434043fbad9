//! geoforce - force-directed layout for node/link graphs drawn on a web map.
//!
//! Anchored nodes stay pinned to the pixel position of their geographic
//! coordinate while free nodes float nearby under link, charge, collision and
//! positional forces. A [`Simulation`] advances the layout one tick at a time
//! and hands every tick to a [`RenderSink`].

pub mod config;
pub mod error;
pub mod forces;
pub mod geo;
pub mod graph;
pub mod graph_types;
pub mod io;
pub mod simulation;
pub mod sink;

pub use config::{ForceSpec, SimulationConfig};
pub use error::{LayoutError, LayoutResult, UnresolvedLink};
pub use forces::{Force, ForceContext, Jiggle};
pub use geo::{GeoProjector, LatLng, MapView, Point};
pub use graph::{Graph, Link, LinkClass, Node, Pin};
pub use graph_types::{GeoLink, GeoNode, GraphData, NodeId, NodeKind};
pub use simulation::{NamedForce, Simulation};
pub use sink::{Frame, FrameSnapshot, JsonLinesSink, NullSink, Recorder, RenderSink};
