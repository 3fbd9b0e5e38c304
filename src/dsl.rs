//! DSL module: builder API for patches.

use crate::buffer::SampleBuffer;
use crate::config::EditorConfig;
use crate::connector::PinRef;
use crate::engine::{AudioEngine, OfflineEngine};
use crate::error::EditorError;
use crate::node::{Lane, NodeId};
use crate::registry::NodeSpec;
use crate::session::EditorSession;
use std::collections::HashMap;
use thiserror::Error;

/// Handle to a node in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(pub NodeId);

impl NodeHandle {
    /// Address the node without a lane.
    pub fn pin(self) -> PinRef {
        PinRef::node(self.0)
    }

    /// Address one lane of a switch.
    pub fn lane(self, lane: Lane) -> PinRef {
        PinRef::lane(self.0, lane)
    }
}

/// The patch builder. The sink is pre-registered as `"master"`.
#[derive(Debug)]
pub struct PatchBuilder<E: AudioEngine = OfflineEngine> {
    session: EditorSession<E>,
    node_names: HashMap<String, NodeId>,
}

impl PatchBuilder<OfflineEngine> {
    /// Create a builder over a default offline session.
    pub fn new() -> Self {
        Self::from_session(EditorSession::default())
    }

    /// Create a builder over an offline session with `config`.
    pub fn with_config(config: EditorConfig) -> Self {
        Self::from_session(EditorSession::new(config))
    }
}

impl Default for PatchBuilder<OfflineEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: AudioEngine> PatchBuilder<E> {
    /// Wrap an existing session.
    pub fn from_session(session: EditorSession<E>) -> Self {
        let mut node_names = HashMap::new();
        node_names.insert("master".to_string(), session.sink());
        Self {
            session,
            node_names,
        }
    }

    /// The sink.
    pub fn sink(&self) -> NodeHandle {
        NodeHandle(self.session.sink())
    }

    /// Add a node.
    pub fn node(&mut self, spec: NodeSpec) -> NodeHandle {
        NodeHandle(self.session.add_node(spec))
    }

    /// Add a named node; the name is also its display name.
    pub fn node_named(&mut self, name: &str, spec: NodeSpec) -> Result<NodeHandle, PatchError> {
        let handle = self.node(spec);
        self.session.rename(handle.0, name)?;
        self.node_names.insert(name.to_string(), handle.0);
        Ok(handle)
    }

    /// Add a named source playing `buffer`.
    pub fn source_named(&mut self, name: &str, buffer: SampleBuffer) -> NodeHandle {
        let id = self.session.on_decoded_audio(buffer, name);
        self.node_names.insert(name.to_string(), id);
        NodeHandle(id)
    }

    /// Look up a named node.
    pub fn handle(&self, name: &str) -> Result<NodeHandle, PatchError> {
        self.node_names
            .get(name)
            .copied()
            .map(NodeHandle)
            .ok_or_else(|| PatchError::MissingNode(name.to_string()))
    }

    /// Connect two endpoints.
    pub fn connect(&mut self, from: PinRef, to: PinRef) -> Result<(), PatchError> {
        self.session.connect(from, to)?;
        Ok(())
    }

    /// Connect two named nodes without lane selectors.
    pub fn connect_named(&mut self, from: &str, to: &str) -> Result<(), PatchError> {
        let from = self.handle(from)?;
        let to = self.handle(to)?;
        self.connect(from.pin(), to.pin())
    }

    /// Build the session.
    pub fn build(self) -> Result<EditorSession<E>, PatchError> {
        Ok(self.session)
    }
}

/// DSL-specific errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    /// The editor rejected an operation.
    #[error(transparent)]
    Editor(#[from] EditorError),
    /// No node carries this name.
    #[error("no node named '{0}'")]
    MissingNode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector;
    use crate::node::SwitchOrientation;

    #[test]
    fn dsl_equivalence() {
        // Build via the DSL and by hand, compare topology
        let mut builder = PatchBuilder::new();
        let vol = builder.node_named("vol", NodeSpec::Gain).unwrap();
        builder.connect_named("vol", "master").unwrap();
        let dsl_session = builder.build().unwrap();

        let mut manual = EditorSession::default();
        let m_vol = manual.add_node(NodeSpec::Gain);
        let sink = manual.sink();
        manual.connect(PinRef::node(m_vol), PinRef::node(sink)).unwrap();

        assert_eq!(vol.0, m_vol);
        assert_eq!(dsl_session.edges(), manual.edges());
        assert_eq!(dsl_session.node(vol.0).unwrap().name(), "vol");
    }

    #[test]
    fn ui_tests() {
        let mut builder = PatchBuilder::new();
        builder.node_named("a", NodeSpec::Gain).unwrap();
        assert_eq!(
            builder.connect_named("a", "nowhere").unwrap_err(),
            PatchError::MissingNode("nowhere".into())
        );
        let master = builder.sink();
        let err = builder.connect(master.pin(), builder.handle("a").unwrap().pin());
        assert!(matches!(
            err,
            Err(PatchError::Editor(EditorError::IncompatibleEndpoint { .. }))
        ));
    }

    #[test]
    fn switch_lanes_by_handle() {
        let mut builder = PatchBuilder::new();
        let sw = builder
            .node_named(
                "sw",
                NodeSpec::Switch {
                    orientation: SwitchOrientation::InputSelect,
                },
            )
            .unwrap();
        let a = builder.node_named("a", NodeSpec::Gain).unwrap();
        builder.connect(a.pin(), sw.lane(Lane::Right)).unwrap();
        builder.connect_named("sw", "master").unwrap();
        let session = builder.build().unwrap();
        assert_eq!(session.edges().len(), 2);
        assert!(connector::is_consistent(session.registry()));
    }
}
