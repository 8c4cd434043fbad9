//! Render sinks
//!
//! A [`RenderSink`] is notified once per completed tick with a read-only
//! [`Frame`]. Sinks never mutate engine state.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::geo::Point;
use crate::graph::{Graph, Node};
use crate::graph_types::NodeId;

/// Read-only view of the layout after a tick
pub struct Frame<'a> {
    pub tick: u64,
    pub alpha: f64,
    graph: &'a Graph,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(tick: u64, alpha: f64, graph: &'a Graph) -> Self {
        Self { tick, alpha, graph }
    }

    pub fn nodes(&self) -> &'a [Node] {
        self.graph.nodes()
    }

    /// Link endpoints at their current positions
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + use<'a> {
        self.graph.link_segments()
    }

    /// Owned, serializable copy of this frame
    pub fn snapshot(&self) -> FrameSnapshot {
        let nodes = self.graph.nodes();
        FrameSnapshot {
            tick: self.tick,
            alpha: self.alpha,
            nodes: nodes
                .iter()
                .map(|n| NodeSnapshot {
                    id: n.id.clone(),
                    x: n.x,
                    y: n.y,
                    anchored: n.is_anchored(),
                })
                .collect(),
            links: self
                .graph
                .links()
                .iter()
                .map(|l| {
                    let (s, t) = (&nodes[l.source], &nodes[l.target]);
                    LinkSnapshot {
                        source: s.id.clone(),
                        target: t.id.clone(),
                        x1: s.x,
                        y1: s.y,
                        x2: t.x,
                        y2: t.y,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub anchored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub source: NodeId,
    pub target: NodeId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Node and link positions at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub alpha: f64,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

/// Receives the layout once per tick
pub trait RenderSink {
    fn on_tick(&mut self, frame: &Frame<'_>);
}

/// Discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn on_tick(&mut self, _frame: &Frame<'_>) {}
}

/// Keeps a snapshot of every frame in memory
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub frames: Vec<FrameSnapshot>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&FrameSnapshot> {
        self.frames.last()
    }
}

impl RenderSink for Recorder {
    fn on_tick(&mut self, frame: &Frame<'_>) {
        self.frames.push(frame.snapshot());
    }
}

/// Writes each frame as one line of JSON.
///
/// `on_tick` cannot report errors, so failed writes are logged and counted.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    failures: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failures: 0,
        }
    }

    /// Number of frames that could not be written
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_frame(&mut self, frame: &Frame<'_>) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, &frame.snapshot())?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> RenderSink for JsonLinesSink<W> {
    fn on_tick(&mut self, frame: &Frame<'_>) {
        if let Err(e) = self.write_frame(frame) {
            self.failures += 1;
            tracing::warn!(tick = frame.tick, error = %e, "failed to write frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;
    use crate::graph_types::{GeoNode, GraphData};

    fn two_node_graph() -> Graph {
        let data = GraphData::new()
            .with_node(GeoNode::anchored("p", 10.0, 20.0))
            .with_node(GeoNode::free("c", 10.0, 20.0))
            .with_link("p", "c");
        let identity = |at: LatLng| Point::new(at.lon, at.lat);
        let mut graph = Graph::from_data(&data, &identity).unwrap();
        graph.place(&"c".into(), Point::new(50.0, 10.0)).unwrap();
        graph
    }

    #[test]
    fn snapshot_resolves_link_endpoints() {
        let graph = two_node_graph();
        let snapshot = Frame::new(3, 0.5, &graph).snapshot();

        assert_eq!(snapshot.tick, 3);
        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot.nodes[0].anchored);
        let link = &snapshot.links[0];
        assert_eq!((link.x1, link.y1, link.x2, link.y2), (20.0, 10.0, 50.0, 10.0));
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_frame() {
        let graph = two_node_graph();
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.on_tick(&Frame::new(1, 0.5, &graph));
        sink.on_tick(&Frame::new(2, 0.25, &graph));

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        insta::assert_snapshot!(
            lines[0],
            @r#"{"tick":1,"alpha":0.5,"nodes":[{"id":"p","x":20.0,"y":10.0,"anchored":true},{"id":"c","x":50.0,"y":10.0,"anchored":false}],"links":[{"source":"p","target":"c","x1":20.0,"y1":10.0,"x2":50.0,"y2":10.0}]}"#
        );
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_sink_counts_failures() {
        let graph = two_node_graph();
        let mut sink = JsonLinesSink::new(BrokenPipe);
        sink.on_tick(&Frame::new(1, 0.5, &graph));
        assert_eq!(sink.failures(), 1);
    }

    #[test]
    fn recorder_keeps_frames() {
        let graph = two_node_graph();
        let mut recorder = Recorder::new();
        recorder.on_tick(&Frame::new(1, 0.9, &graph));
        recorder.on_tick(&Frame::new(2, 0.8, &graph));
        assert_eq!(recorder.frames.len(), 2);
        assert_eq!(recorder.last().map(|f| f.tick), Some(2));
    }
}
