//! Node registry: owns every node by id.

use crate::buffer::SampleBuffer;
use crate::connector;
use crate::engine::AudioEngine;
use crate::error::{EditorError, Result};
use crate::invariant_ppt::{assert_invariant, DELETE_SEVERS_EDGES};
use crate::node::{
    EdgeMap, Edge, GainNode, KindTag, Lane, Node, NodeId, NodeKind, SinkNode, SourceNode,
    SwitchNode, SwitchOrientation,
};
use crate::playback::{self, Transport};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Display name of the sink.
pub const SINK_NAME: &str = "master node";

/// Node kinds that can be created on demand. Sources come from ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSpec {
    /// A volume control.
    Gain,
    /// A dual-lane switch.
    Switch {
        /// Which side carries the lanes.
        orientation: SwitchOrientation,
    },
}

impl NodeSpec {
    /// Name given to freshly created nodes of this kind.
    pub fn default_name(self) -> &'static str {
        match self {
            NodeSpec::Gain => "volume control",
            NodeSpec::Switch {
                orientation: SwitchOrientation::InputSelect,
            } => "input switch",
            NodeSpec::Switch {
                orientation: SwitchOrientation::OutputSelect,
            } => "output switch",
        }
    }
}

/// The node store. The sink exists from construction and cannot be deleted.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u32,
    sink: NodeId,
    default_gain: f32,
}

impl Registry {
    /// Create a registry holding only the sink, bound to the engine's destination.
    pub fn new<E: AudioEngine>(engine: &E) -> Self {
        let mut reg = Self {
            nodes: BTreeMap::new(),
            next_id: 0,
            sink: NodeId(0),
            default_gain: 1.0,
        };
        reg.sink = reg.insert(
            SINK_NAME.to_string(),
            NodeKind::Sink(SinkNode {
                destination: engine.destination(),
                inputs: EdgeMap::default(),
            }),
        );
        reg
    }

    /// Gain given to volume controls created from now on.
    pub fn with_default_gain(mut self, gain: f32) -> Self {
        self.default_gain = gain;
        self
    }

    /// Id of the sink.
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Create a gain or switch, allocating its persistent engine objects.
    pub fn create<E: AudioEngine>(
        &mut self,
        engine: &mut E,
        spec: NodeSpec,
        name: Option<String>,
    ) -> NodeId {
        let name = name.unwrap_or_else(|| spec.default_name().to_string());
        let kind = match spec {
            NodeSpec::Gain => {
                let object = engine.create_gain();
                engine.set_gain(object, self.default_gain);
                NodeKind::Gain(GainNode {
                    object,
                    gain: self.default_gain,
                    inputs: EdgeMap::default(),
                    outputs: EdgeMap::default(),
                })
            }
            NodeSpec::Switch { orientation } => {
                let switch = SwitchNode {
                    orientation,
                    lane_objects: [engine.create_routing(), engine.create_routing()],
                    common: engine.create_routing(),
                    lane_edges: Default::default(),
                    common_edges: EdgeMap::default(),
                    active: Lane::Left,
                };
                let (from, to) = switch.internal_route(switch.active);
                engine.attach(from, to);
                NodeKind::Switch(switch)
            }
        };
        self.insert(name, kind)
    }

    /// Create an idle source bound to a decoded buffer.
    pub fn create_source(&mut self, buffer: Arc<SampleBuffer>, name: impl Into<String>) -> NodeId {
        self.insert(
            name.into(),
            NodeKind::Source(SourceNode {
                buffer,
                outputs: EdgeMap::default(),
                transport: Transport::default(),
            }),
        )
    }

    fn insert(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        tracing::debug!(node = %id, name = %name, "node created");
        self.nodes.insert(id, Node { id, name, kind });
        id
    }

    /// Look up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a node, failing closed on stale ids.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(EditorError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(EditorError::UnknownNode(id))
    }

    /// Look up a source node.
    pub fn source(&self, id: NodeId) -> Result<&SourceNode> {
        self.node(id)?.as_source().ok_or(EditorError::WrongKind {
            node: id,
            expected: KindTag::Source,
        })
    }

    pub(crate) fn source_mut(&mut self, id: NodeId) -> Result<&mut SourceNode> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Source(s) => Ok(s),
            _ => Err(EditorError::WrongKind {
                node: id,
                expected: KindTag::Source,
            }),
        }
    }

    /// Whether a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, sink included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the sink is permanent.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node ids in order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Change a node's display name. Any string is accepted.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        let node = self.node_mut(id)?;
        node.name = name.into();
        tracing::debug!(node = %id, name = %node.name, "node renamed");
        Ok(())
    }

    /// Set the linear gain of a gain node.
    pub fn set_gain<E: AudioEngine>(&mut self, engine: &mut E, id: NodeId, gain: f32) -> Result<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Gain(g) => {
                g.gain = gain;
                engine.set_gain(g.object, gain);
                tracing::debug!(node = %id, gain, "gain set");
                Ok(())
            }
            _ => Err(EditorError::WrongKind {
                node: id,
                expected: KindTag::Gain,
            }),
        }
    }

    /// Route a switch through `lane`. Logical edges are untouched.
    pub fn set_switch<E: AudioEngine>(&mut self, engine: &mut E, id: NodeId, lane: Lane) -> Result<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Switch(s) => {
                if s.active != lane {
                    let (from, to) = s.internal_route(s.active);
                    engine.detach(from, to);
                    s.active = lane;
                    let (from, to) = s.internal_route(lane);
                    engine.attach(from, to);
                    tracing::debug!(node = %id, lane = %lane, "switch moved");
                }
                Ok(())
            }
            _ => Err(EditorError::WrongKind {
                node: id,
                expected: KindTag::Switch,
            }),
        }
    }

    /// Delete a node: stop its playback, sever every edge touching it,
    /// release its engine objects and forget it. Returns the severed edges.
    pub fn delete<E: AudioEngine>(&mut self, engine: &mut E, id: NodeId) -> Result<Vec<Edge>> {
        if id == self.sink {
            return Err(EditorError::PermanentNode(id));
        }
        self.node(id)?;
        playback::discard(self, engine, id);
        let severed = connector::disconnect_all(self, engine, id)?;
        let node = self.nodes.remove(&id).ok_or(EditorError::UnknownNode(id))?;
        for object in node.owned_objects() {
            engine.release(object);
        }

        let dangling = self
            .nodes
            .values()
            .flat_map(|n| n.edge_maps())
            .any(|(_, _, map)| map.contains(id));
        assert_invariant(
            DELETE_SEVERS_EDGES,
            !dangling,
            "Deleted node still referenced by an adjacency map",
            Some("delete"),
        );
        tracing::info!(node = %id, name = %node.name, edges = severed.len(), "node deleted");
        Ok(severed)
    }
}
