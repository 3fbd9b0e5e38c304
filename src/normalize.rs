//! Port normalizer: a uniform input/output view over every node kind.
//!
//! Normalization never mutates anything. It is safe to call speculatively.

use crate::engine::EngineNode;
use crate::error::{EditorError, Result};
use crate::invariant_ppt::{assert_invariant, ENDPOINT_REJECTS_INCOMPATIBLE};
use crate::node::{Direction, EdgeMap, Lane, Node, NodeKind, Port};

/// One side of a node as seen by the connector.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    /// Resolved port; carries a lane only on a switch's lane side.
    pub port: Port,
    /// Engine object to attach. `None` for a source that is not playing.
    pub engine: Option<EngineNode>,
    /// Adjacency map for this side.
    pub edges: &'a EdgeMap,
}

/// Uniform view of a node for a given lane request.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    node: &'a Node,
    input: Option<Endpoint<'a>>,
    output: Option<Endpoint<'a>>,
    lane_side: Option<Direction>,
    requested: Option<Lane>,
}

impl<'a> NodeView<'a> {
    /// Input side, if the node has one.
    pub fn input(&self) -> Option<&Endpoint<'a>> {
        self.input.as_ref()
    }

    /// Output side, if the node has one.
    pub fn output(&self) -> Option<&Endpoint<'a>> {
        self.output.as_ref()
    }

    /// The side on which lanes are selectable, for switches.
    pub fn lane_side(&self) -> Option<Direction> {
        self.lane_side
    }

    /// The endpoint for `direction`.
    ///
    /// Fails with `FixedSideLane` when an explicit lane was requested for a
    /// switch side that has no lanes, and with `IncompatibleEndpoint` when the
    /// node has no endpoint in that direction.
    pub fn endpoint(&self, direction: Direction) -> Result<Endpoint<'a>> {
        if self.requested.is_some() && self.lane_side != Some(direction) {
            return Err(EditorError::FixedSideLane {
                node: self.node.id,
                direction,
            });
        }
        let endpoint = match direction {
            Direction::Input => self.input,
            Direction::Output => self.output,
        };
        match endpoint {
            Some(endpoint) => Ok(endpoint),
            None => {
                // A side without an endpoint has no adjacency map either.
                let orphaned = self
                    .node
                    .edge_maps()
                    .iter()
                    .any(|(_, side, _)| *side == direction);
                assert_invariant(
                    ENDPOINT_REJECTS_INCOMPATIBLE,
                    !orphaned,
                    "Node without an endpoint still has an adjacency map on that side",
                    Some("normalize"),
                );
                tracing::warn!(node = %self.node.id, %direction, "incompatible endpoint");
                Err(EditorError::IncompatibleEndpoint {
                    node: self.node.id,
                    direction,
                })
            }
        }
    }
}

/// Project `node` into a uniform view.
///
/// `lane` selects a switch lane; `None` means the switch's active lane on the
/// lane side and the common object on the fixed side. Non-switch nodes have a
/// single implicit lane and reject explicit ones.
pub fn normalize(node: &Node, lane: Option<Lane>) -> Result<NodeView<'_>> {
    let id = node.id;
    let fixed = Port::fixed(id);
    let view = match &node.kind {
        NodeKind::Source(s) => NodeView {
            node,
            input: None,
            output: Some(Endpoint {
                port: fixed,
                engine: s.transport.playback(),
                edges: &s.outputs,
            }),
            lane_side: None,
            requested: lane,
        },
        NodeKind::Gain(g) => NodeView {
            node,
            input: Some(Endpoint {
                port: fixed,
                engine: Some(g.object),
                edges: &g.inputs,
            }),
            output: Some(Endpoint {
                port: fixed,
                engine: Some(g.object),
                edges: &g.outputs,
            }),
            lane_side: None,
            requested: lane,
        },
        NodeKind::Switch(s) => {
            let resolved = lane.unwrap_or(s.active);
            let laned = Endpoint {
                port: Port::on_lane(id, resolved),
                engine: Some(s.lane_object(resolved)),
                edges: &s.lane_edges[resolved.index()],
            };
            let common = Endpoint {
                port: fixed,
                engine: Some(s.common),
                edges: &s.common_edges,
            };
            let lane_side = s.orientation.lane_side();
            let (input, output) = match lane_side {
                Direction::Input => (laned, common),
                Direction::Output => (common, laned),
            };
            NodeView {
                node,
                input: Some(input),
                output: Some(output),
                lane_side: Some(lane_side),
                requested: lane,
            }
        }
        NodeKind::Sink(s) => NodeView {
            node,
            input: Some(Endpoint {
                port: fixed,
                engine: Some(s.destination),
                edges: &s.inputs,
            }),
            output: None,
            lane_side: None,
            requested: lane,
        },
    };

    if let (Some(lane), None) = (lane, view.lane_side) {
        return Err(EditorError::UnknownLane {
            node: id,
            lane: lane.index(),
        });
    }
    Ok(view)
}
