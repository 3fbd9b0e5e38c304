//! Graph connector: keeps the logical adjacency and the engine graph in step.
//!
//! Every edge lives in two maps: the outbound map of its source side and the
//! inbound map of its destination side. Only this module writes those maps,
//! and it always writes both together.

use crate::engine::{AudioEngine, EngineNode};
use crate::error::{EditorError, Result};
use crate::invariant_ppt::{
    assert_invariant, ADJACENCY_MIRRORED, CONNECT_IDEMPOTENT, DISCONNECT_MISSING_NOOP,
    OUTPUTS_REAPPLIED,
};
use crate::node::{Direction, Edge, EdgeMap, Lane, Node, NodeId, Port};
use crate::normalize::normalize;
use crate::registry::Registry;

/// A requested endpoint: a node plus an optional lane selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinRef {
    /// Target node.
    pub node: NodeId,
    /// Switch lane; `None` means the active lane or the fixed side.
    pub lane: Option<Lane>,
}

impl PinRef {
    /// A pin with no lane selector.
    pub fn node(node: NodeId) -> Self {
        Self { node, lane: None }
    }

    /// A pin on an explicit lane.
    pub fn lane(node: NodeId, lane: Lane) -> Self {
        Self {
            node,
            lane: Some(lane),
        }
    }
}

impl From<NodeId> for PinRef {
    fn from(node: NodeId) -> Self {
        Self::node(node)
    }
}

impl From<Port> for PinRef {
    fn from(port: Port) -> Self {
        Self {
            node: port.node,
            lane: port.lane,
        }
    }
}

/// Result of a successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new edge was recorded.
    Connected(Edge),
    /// The edge already existed; nothing changed.
    AlreadyConnected(Edge),
}

impl ConnectOutcome {
    /// The edge in question.
    pub fn edge(&self) -> Edge {
        match self {
            ConnectOutcome::Connected(e) | ConnectOutcome::AlreadyConnected(e) => *e,
        }
    }
}

struct Resolved {
    port: Port,
    engine: Option<EngineNode>,
    peer_lane: Option<Option<Lane>>,
}

fn resolve(reg: &Registry, pin: PinRef, direction: Direction, peer: NodeId) -> Result<Resolved> {
    let view = normalize(reg.node(pin.node)?, pin.lane)?;
    let endpoint = view.endpoint(direction)?;
    Ok(Resolved {
        port: endpoint.port,
        engine: endpoint.engine,
        peer_lane: endpoint.edges.get(peer),
    })
}

/// Connect `from`'s output to `to`'s input.
///
/// Connecting an existing edge again is a no-op. If the pair is already
/// joined on other lanes, that edge is torn down first, so each map holds at
/// most one entry per peer. Failures leave everything untouched.
pub fn connect<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    from: PinRef,
    to: PinRef,
) -> Result<ConnectOutcome> {
    if from.node == to.node {
        tracing::warn!(node = %from.node, "rejected self-loop");
        return Err(EditorError::SelfLoop(from.node));
    }
    let source = resolve(reg, from, Direction::Output, to.node)?;
    let dest = resolve(reg, to, Direction::Input, from.node)?;
    let edge = Edge {
        from: source.port,
        to: dest.port,
    };

    if source.peer_lane == Some(dest.port.lane) && dest.peer_lane == Some(source.port.lane) {
        assert_invariant(
            CONNECT_IDEMPOTENT,
            is_mirrored(reg, &edge),
            "Repeated connect must find the edge on both sides",
            Some("connect"),
        );
        tracing::debug!(%edge, "already connected");
        return Ok(ConnectOutcome::AlreadyConnected(edge));
    }

    let mut stale = Vec::with_capacity(2);
    if let Some(lane) = source.peer_lane {
        stale.push(Edge {
            from: source.port,
            to: Port { node: to.node, lane },
        });
    }
    if let Some(lane) = dest.peer_lane {
        let old = Edge {
            from: Port {
                node: from.node,
                lane,
            },
            to: dest.port,
        };
        if !stale.contains(&old) {
            stale.push(old);
        }
    }
    for old in stale {
        tracing::debug!(edge = %old, "replacing edge between the same nodes");
        disconnect_edge(reg, engine, old)?;
    }

    if let (Some(a), Some(b)) = (source.engine, dest.engine) {
        engine.attach(a, b);
    }
    map_mut(reg, edge.from, Direction::Output)?.insert(to.node, dest.port.lane);
    map_mut(reg, edge.to, Direction::Input)?.insert(from.node, source.port.lane);

    assert_invariant(
        ADJACENCY_MIRRORED,
        is_mirrored(reg, &edge),
        "Edge must be recorded on both sides",
        Some("connect"),
    );
    tracing::info!(
        "'{}' connected to '{}' ({edge})",
        display_name(reg, from.node),
        display_name(reg, to.node)
    );
    Ok(ConnectOutcome::Connected(edge))
}

/// Disconnect `from`'s output from `to`'s input.
///
/// Returns whether an edge was removed. A missing edge, including one whose
/// endpoints could never carry an edge, is a no-op. Stale node ids and lanes
/// given where a node has none fail like they do for [`connect`].
///
/// Lanes resolve exactly as in [`connect`]: a switch pin without a lane
/// names the *active* lane, so an edge parked on the inactive lane is only
/// reached by naming that lane.
pub fn disconnect<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    from: PinRef,
    to: PinRef,
) -> Result<bool> {
    reg.node(from.node)?;
    reg.node(to.node)?;
    let resolved = resolve(reg, from, Direction::Output, to.node)
        .and_then(|s| resolve(reg, to, Direction::Input, from.node).map(|d| (s, d)));
    match resolved {
        Ok((source, dest)) => disconnect_edge(
            reg,
            engine,
            Edge {
                from: source.port,
                to: dest.port,
            },
        ),
        Err(err @ EditorError::IncompatibleEndpoint { .. }) => {
            let joined = reg
                .node(from.node)?
                .edges()
                .iter()
                .any(|edge| edge.from.node == from.node && edge.to.node == to.node);
            assert_invariant(
                DISCONNECT_MISSING_NOOP,
                !joined,
                "Endpoints that cannot carry an edge are joined by one",
                Some(err.to_string().as_str()),
            );
            tracing::debug!(%err, "nothing to disconnect");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Remove a resolved edge. Returns whether it existed.
pub fn disconnect_edge<E: AudioEngine>(reg: &mut Registry, engine: &mut E, edge: Edge) -> Result<bool> {
    if !is_mirrored(reg, &edge) {
        assert_invariant(
            DISCONNECT_MISSING_NOOP,
            !has_edge_half(reg, &edge),
            "A half-recorded edge was found",
            Some("disconnect"),
        );
        tracing::debug!(%edge, "edge not present");
        return Ok(false);
    }
    let a = port_object(reg, edge.from, Direction::Output)?;
    let b = port_object(reg, edge.to, Direction::Input)?;
    if let (Some(a), Some(b)) = (a, b) {
        engine.detach(a, b);
    }
    map_mut(reg, edge.from, Direction::Output)?.remove(edge.to.node);
    map_mut(reg, edge.to, Direction::Input)?.remove(edge.from.node);

    assert_invariant(
        ADJACENCY_MIRRORED,
        !has_edge_half(reg, &edge),
        "Edge must be removed from both sides",
        Some("disconnect"),
    );
    tracing::info!(
        "'{}' disconnected from '{}' ({edge})",
        display_name(reg, edge.from.node),
        display_name(reg, edge.to.node)
    );
    Ok(true)
}

/// Sever every edge touching `id`, in both directions.
pub fn disconnect_all<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    id: NodeId,
) -> Result<Vec<Edge>> {
    let edges = reg.node(id)?.edges();
    let mut removed = Vec::with_capacity(edges.len());
    for edge in edges {
        if disconnect_edge(reg, engine, edge)? {
            removed.push(edge);
        }
    }
    Ok(removed)
}

/// Re-attach the current engine object of `id` to every outbound edge.
///
/// Adjacency is not touched; it already describes the intended wiring.
/// Returns the number of attachments made.
pub fn reapply_outputs<E: AudioEngine>(reg: &Registry, engine: &mut E, id: NodeId) -> Result<usize> {
    let node = reg.node(id)?;
    let mut pairs = Vec::new();
    let mut expected = 0;
    for (port, direction, map) in node.edge_maps() {
        if direction != Direction::Output {
            continue;
        }
        let Some(own) = port_object(reg, port, Direction::Output)? else {
            continue;
        };
        expected += map.len();
        for (peer, lane) in map.iter() {
            if let Some(other) = port_object(reg, Port { node: peer, lane }, Direction::Input)? {
                pairs.push((own, other));
            }
        }
    }
    for &(a, b) in &pairs {
        engine.attach(a, b);
    }
    assert_invariant(
        OUTPUTS_REAPPLIED,
        pairs.len() == expected,
        "Every outbound edge must be re-attached",
        Some("reapply_outputs"),
    );
    tracing::debug!(node = %id, count = pairs.len(), "outputs reapplied");
    Ok(pairs.len())
}

/// Every logical edge, ordered.
pub fn edges(reg: &Registry) -> Vec<Edge> {
    let mut all: Vec<Edge> = reg.iter().flat_map(|node| node.edges()).collect();
    all.sort();
    all.dedup();
    all
}

/// Whether every recorded edge half has its mirror on the other side.
pub fn is_consistent(reg: &Registry) -> bool {
    reg.iter()
        .all(|node| node.edges().iter().all(|edge| is_mirrored(reg, edge)))
}

fn is_mirrored(reg: &Registry, edge: &Edge) -> bool {
    let out = side_map(reg, edge.from, Direction::Output).and_then(|m| m.get(edge.to.node));
    let inb = side_map(reg, edge.to, Direction::Input).and_then(|m| m.get(edge.from.node));
    out == Some(edge.to.lane) && inb == Some(edge.from.lane)
}

fn has_edge_half(reg: &Registry, edge: &Edge) -> bool {
    let out = side_map(reg, edge.from, Direction::Output).and_then(|m| m.get(edge.to.node));
    let inb = side_map(reg, edge.to, Direction::Input).and_then(|m| m.get(edge.from.node));
    out == Some(edge.to.lane) || inb == Some(edge.from.lane)
}

fn side_map(reg: &Registry, port: Port, direction: Direction) -> Option<&EdgeMap> {
    let node: &Node = reg.get(port.node)?;
    node.edge_maps()
        .into_iter()
        .find(|(p, d, _)| *d == direction && p.lane == port.lane)
        .map(|(_, _, map)| map)
}

fn map_mut(reg: &mut Registry, port: Port, direction: Direction) -> Result<&mut EdgeMap> {
    reg.node_mut(port.node)?
        .edge_map_mut(direction, port.lane)
        .ok_or(EditorError::IncompatibleEndpoint {
            node: port.node,
            direction,
        })
}

fn port_object(reg: &Registry, port: Port, direction: Direction) -> Result<Option<EngineNode>> {
    let view = normalize(reg.node(port.node)?, port.lane)?;
    Ok(view.endpoint(direction)?.engine)
}

fn display_name(reg: &Registry, id: NodeId) -> &str {
    reg.get(id).map(|n| n.name()).unwrap_or("?")
}
