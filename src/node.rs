//! Node model: identifiers, lanes, ports, edges and per-kind payloads.

use crate::buffer::SampleBuffer;
use crate::engine::EngineNode;
use crate::playback::Transport;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a node. Assigned monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// One of the two parallel port sets on a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    /// Lane 0.
    Left,
    /// Lane 1.
    Right,
}

impl Lane {
    /// Both lanes, in index order.
    pub const ALL: [Lane; 2] = [Lane::Left, Lane::Right];

    /// Numeric lane index (0 = left, 1 = right).
    pub fn index(self) -> usize {
        match self {
            Lane::Left => 0,
            Lane::Right => 1,
        }
    }

    /// Lane for a numeric index.
    pub fn from_index(index: usize) -> Option<Lane> {
        match index {
            0 => Some(Lane::Left),
            1 => Some(Lane::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Left => write!(f, "left"),
            Lane::Right => write!(f, "right"),
        }
    }
}

/// Which side of a node a pin or endpoint sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Signal enters the node here.
    Input,
    /// Signal leaves the node here.
    Output,
}

impl Direction {
    /// The other side.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Kind of a node, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    /// File-backed sample source.
    Source,
    /// Volume control.
    Gain,
    /// Dual-lane switch.
    Switch,
    /// The audio destination.
    Sink,
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindTag::Source => write!(f, "source"),
            KindTag::Gain => write!(f, "gain"),
            KindTag::Switch => write!(f, "switch"),
            KindTag::Sink => write!(f, "sink"),
        }
    }
}

/// Which side of a switch carries the two lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchOrientation {
    /// Two selectable inputs feeding one common output.
    InputSelect,
    /// One common input feeding two selectable outputs.
    OutputSelect,
}

impl SwitchOrientation {
    /// The side on which lanes are selectable.
    pub fn lane_side(self) -> Direction {
        match self {
            SwitchOrientation::InputSelect => Direction::Input,
            SwitchOrientation::OutputSelect => Direction::Output,
        }
    }
}

/// A resolved endpoint: a node plus the lane it occupies.
///
/// `lane` is `Some` only on the lane side of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port {
    /// Owning node.
    pub node: NodeId,
    /// Lane on a switch's lane side.
    pub lane: Option<Lane>,
}

impl Port {
    /// A port with no lane.
    pub fn fixed(node: NodeId) -> Self {
        Self { node, lane: None }
    }

    /// A port on a specific lane.
    pub fn on_lane(node: NodeId, lane: Lane) -> Self {
        Self {
            node,
            lane: Some(lane),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lane {
            Some(lane) => write!(f, "{}[{}]", self.node, lane),
            None => write!(f, "{}", self.node),
        }
    }
}

/// A logical connection from one node's output to another node's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    /// Output side.
    pub from: Port,
    /// Input side.
    pub to: Port,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// One side of the adjacency bookkeeping: peer node id to peer lane.
///
/// Only the connector mutates edge maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeMap(BTreeMap<NodeId, Option<Lane>>);

impl EdgeMap {
    /// Lane recorded for `peer`, if an edge to it exists.
    pub fn get(&self, peer: NodeId) -> Option<Option<Lane>> {
        self.0.get(&peer).copied()
    }

    /// Whether an edge to `peer` exists.
    pub fn contains(&self, peer: NodeId) -> bool {
        self.0.contains_key(&peer)
    }

    /// Peers and their lanes, ordered by node id.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<Lane>)> + '_ {
        self.0.iter().map(|(&n, &l)| (n, l))
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no edges.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, peer: NodeId, lane: Option<Lane>) {
        self.0.insert(peer, lane);
    }

    pub(crate) fn remove(&mut self, peer: NodeId) -> Option<Option<Lane>> {
        self.0.remove(&peer)
    }
}

/// Payload of a file-backed source.
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub(crate) buffer: Arc<SampleBuffer>,
    pub(crate) outputs: EdgeMap,
    pub(crate) transport: Transport,
}

impl SourceNode {
    /// Decoded buffer the source plays.
    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    /// Outbound edges.
    pub fn outputs(&self) -> &EdgeMap {
        &self.outputs
    }

    /// Transport state.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

/// Payload of a volume control.
#[derive(Debug, Clone)]
pub struct GainNode {
    pub(crate) object: EngineNode,
    pub(crate) gain: f32,
    pub(crate) inputs: EdgeMap,
    pub(crate) outputs: EdgeMap,
}

impl GainNode {
    /// Engine gain object; both input and output attach point.
    pub fn object(&self) -> EngineNode {
        self.object
    }

    /// Current linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Inbound edges.
    pub fn inputs(&self) -> &EdgeMap {
        &self.inputs
    }

    /// Outbound edges.
    pub fn outputs(&self) -> &EdgeMap {
        &self.outputs
    }
}

/// Payload of a dual-lane switch.
#[derive(Debug, Clone)]
pub struct SwitchNode {
    pub(crate) orientation: SwitchOrientation,
    pub(crate) lane_objects: [EngineNode; 2],
    pub(crate) common: EngineNode,
    pub(crate) lane_edges: [EdgeMap; 2],
    pub(crate) common_edges: EdgeMap,
    pub(crate) active: Lane,
}

impl SwitchNode {
    /// Input- or output-selecting.
    pub fn orientation(&self) -> SwitchOrientation {
        self.orientation
    }

    /// Lane currently routed through the common object.
    pub fn active(&self) -> Lane {
        self.active
    }

    /// Engine object of a lane.
    pub fn lane_object(&self, lane: Lane) -> EngineNode {
        self.lane_objects[lane.index()]
    }

    /// Engine object shared by both lanes.
    pub fn common_object(&self) -> EngineNode {
        self.common
    }

    /// Edges on a lane.
    pub fn lane_edges(&self, lane: Lane) -> &EdgeMap {
        &self.lane_edges[lane.index()]
    }

    /// Edges on the common side.
    pub fn common_edges(&self) -> &EdgeMap {
        &self.common_edges
    }

    /// The internal route carrying signal for `lane`, as (from, to).
    pub(crate) fn internal_route(&self, lane: Lane) -> (EngineNode, EngineNode) {
        let lane_object = self.lane_object(lane);
        match self.orientation {
            SwitchOrientation::InputSelect => (lane_object, self.common),
            SwitchOrientation::OutputSelect => (self.common, lane_object),
        }
    }
}

/// Payload of the sink.
#[derive(Debug, Clone)]
pub struct SinkNode {
    pub(crate) destination: EngineNode,
    pub(crate) inputs: EdgeMap,
}

impl SinkNode {
    /// The engine destination.
    pub fn destination(&self) -> EngineNode {
        self.destination
    }

    /// Inbound edges.
    pub fn inputs(&self) -> &EdgeMap {
        &self.inputs
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// File-backed sample source.
    Source(SourceNode),
    /// Volume control.
    Gain(GainNode),
    /// Dual-lane switch.
    Switch(SwitchNode),
    /// The audio destination.
    Sink(SinkNode),
}

/// A node in the routing graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// User-editable display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Kind tag.
    pub fn tag(&self) -> KindTag {
        match self.kind {
            NodeKind::Source(_) => KindTag::Source,
            NodeKind::Gain(_) => KindTag::Gain,
            NodeKind::Switch(_) => KindTag::Switch,
            NodeKind::Sink(_) => KindTag::Sink,
        }
    }

    /// Source payload, if this is a source.
    pub fn as_source(&self) -> Option<&SourceNode> {
        match &self.kind {
            NodeKind::Source(s) => Some(s),
            _ => None,
        }
    }

    /// Gain payload, if this is a gain.
    pub fn as_gain(&self) -> Option<&GainNode> {
        match &self.kind {
            NodeKind::Gain(g) => Some(g),
            _ => None,
        }
    }

    /// Switch payload, if this is a switch.
    pub fn as_switch(&self) -> Option<&SwitchNode> {
        match &self.kind {
            NodeKind::Switch(s) => Some(s),
            _ => None,
        }
    }

    /// Every edge map on this node with the port and side it belongs to.
    pub fn edge_maps(&self) -> Vec<(Port, Direction, &EdgeMap)> {
        let here = Port::fixed(self.id);
        match &self.kind {
            NodeKind::Source(s) => vec![(here, Direction::Output, &s.outputs)],
            NodeKind::Gain(g) => vec![
                (here, Direction::Input, &g.inputs),
                (here, Direction::Output, &g.outputs),
            ],
            NodeKind::Switch(s) => {
                let lane_side = s.orientation.lane_side();
                let mut maps: Vec<_> = Lane::ALL
                    .iter()
                    .map(|&lane| {
                        (
                            Port::on_lane(self.id, lane),
                            lane_side,
                            &s.lane_edges[lane.index()],
                        )
                    })
                    .collect();
                maps.push((here, lane_side.opposite(), &s.common_edges));
                maps
            }
            NodeKind::Sink(s) => vec![(here, Direction::Input, &s.inputs)],
        }
    }

    /// Every edge touching this node, oriented output to input.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (port, direction, map) in self.edge_maps() {
            for (peer, lane) in map.iter() {
                let other = Port { node: peer, lane };
                edges.push(match direction {
                    Direction::Output => Edge {
                        from: port,
                        to: other,
                    },
                    Direction::Input => Edge {
                        from: other,
                        to: port,
                    },
                });
            }
        }
        edges
    }

    /// Persistent engine objects owned by this node (the destination excluded).
    pub fn owned_objects(&self) -> Vec<EngineNode> {
        match &self.kind {
            NodeKind::Source(s) => s.transport.playback().into_iter().collect(),
            NodeKind::Gain(g) => vec![g.object],
            NodeKind::Switch(s) => vec![s.lane_objects[0], s.lane_objects[1], s.common],
            NodeKind::Sink(_) => Vec::new(),
        }
    }

    /// Edge map for a resolved port side, mutable.
    ///
    /// `lane` must be the resolved lane recorded in [`Port`]: `Some` only on
    /// a switch's lane side.
    pub(crate) fn edge_map_mut(
        &mut self,
        direction: Direction,
        lane: Option<Lane>,
    ) -> Option<&mut EdgeMap> {
        match (&mut self.kind, direction) {
            (NodeKind::Source(s), Direction::Output) => Some(&mut s.outputs),
            (NodeKind::Gain(g), Direction::Input) => Some(&mut g.inputs),
            (NodeKind::Gain(g), Direction::Output) => Some(&mut g.outputs),
            (NodeKind::Sink(s), Direction::Input) => Some(&mut s.inputs),
            (NodeKind::Switch(s), direction) => {
                if direction == s.orientation.lane_side() {
                    lane.map(|l| &mut s.lane_edges[l.index()])
                } else {
                    Some(&mut s.common_edges)
                }
            }
            _ => None,
        }
    }
}
