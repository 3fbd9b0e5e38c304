//! Editor session: the single context object behind the UI.
//!
//! The session owns the registry, the engine, the active tool, the pending
//! pin and the pin labels. Commands come in as method calls; everything a
//! renderer needs to redraw comes out as [`EditorEvent`]s.

use crate::buffer::SampleBuffer;
use crate::config::EditorConfig;
use crate::connector::{self, ConnectOutcome, PinRef};
use crate::engine::{AudioEngine, OfflineEngine, PlanError};
use crate::error::{EditorError, Result};
use crate::ingest::{self, AudioDecoder, DroppedFile};
use crate::node::{Direction, Edge, KindTag, Lane, Node, NodeId, Port};
use crate::normalize::normalize;
use crate::pin::{PinClick, PinLabel, PinSelector, Selection};
use crate::playback::{self, PlaybackStatus};
use crate::registry::{NodeSpec, Registry};
use crate::tool::{ToolController, ToolMode};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Notifications for the rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A node was added.
    NodeCreated {
        /// New node.
        node: NodeId,
        /// Its kind.
        kind: KindTag,
        /// Its display name.
        name: String,
    },
    /// A node's display name changed.
    NodeRenamed {
        /// Renamed node.
        node: NodeId,
        /// New name.
        name: String,
    },
    /// A node was deleted.
    NodeDeleted {
        /// Deleted node.
        node: NodeId,
    },
    /// An edge was created and labelled.
    EdgeCreated {
        /// New edge.
        edge: Edge,
        /// Label shown on both of its pins.
        label: PinLabel,
    },
    /// An edge went away.
    EdgeRemoved {
        /// Removed edge.
        edge: Edge,
    },
    /// The pending pin changed.
    PendingChanged {
        /// The new pending pin, if any.
        pending: Option<PinClick>,
    },
    /// The tool mode changed.
    ModeChanged {
        /// New mode.
        mode: ToolMode,
    },
    /// A source's transport status changed.
    PlaybackChanged {
        /// Source node.
        node: NodeId,
        /// New status.
        status: PlaybackStatus,
    },
}

/// What a pin click did.
#[derive(Debug, Clone, PartialEq)]
pub enum PinOutcome {
    /// The pin is now pending.
    Pending(PinClick),
    /// The pin replaced the previously pending one.
    Replaced(PinClick),
    /// The pending pin was dropped without a connection.
    Cancelled,
    /// A new edge was created.
    Connected {
        /// The edge.
        edge: Edge,
        /// Its label.
        label: PinLabel,
    },
    /// The pair was already connected.
    AlreadyConnected(Edge),
    /// Disconnect mode severed these edges.
    Disconnected(Vec<Edge>),
    /// The click had no effect.
    Ignored,
}

/// Editor state for one document.
#[derive(Debug)]
pub struct EditorSession<E: AudioEngine = OfflineEngine> {
    config: EditorConfig,
    registry: Registry,
    engine: E,
    tools: ToolController,
    pins: PinSelector,
    labels: BTreeMap<Edge, PinLabel>,
    events: Vec<EditorEvent>,
}

impl EditorSession<OfflineEngine> {
    /// Session backed by an offline engine configured from `config`.
    pub fn new(config: EditorConfig) -> Self {
        let engine = OfflineEngine::new(config.sample_rate, config.block_size);
        Self::with_engine(config, engine)
    }

    /// Render `frames` of the destination mix and deliver ended events.
    pub fn render(&mut self, frames: usize) -> std::result::Result<Vec<f32>, PlanError> {
        let out = self.engine.render(frames)?;
        self.poll_engine();
        Ok(out)
    }

    /// Advance the engine clock and deliver ended events.
    pub fn advance(&mut self, seconds: f64) -> Vec<NodeId> {
        self.engine.advance(seconds);
        self.poll_engine()
    }
}

impl Default for EditorSession<OfflineEngine> {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl<E: AudioEngine> EditorSession<E> {
    /// Session on top of an existing engine. The sink is created here.
    pub fn with_engine(config: EditorConfig, engine: E) -> Self {
        let registry = Registry::new(&engine).with_default_gain(config.default_gain);
        let pins = PinSelector::new(&config.pin_alphabet);
        Self {
            config,
            registry,
            engine,
            tools: ToolController::new(),
            pins,
            labels: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The node store.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Id of the sink.
    pub fn sink(&self) -> NodeId {
        self.registry.sink()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.registry.node(id)
    }

    /// Active tool mode.
    pub fn mode(&self) -> ToolMode {
        self.tools.mode()
    }

    /// Pending pin, if any.
    pub fn pending(&self) -> Option<PinClick> {
        self.pins.pending()
    }

    /// Every logical edge.
    pub fn edges(&self) -> Vec<Edge> {
        connector::edges(&self.registry)
    }

    /// Label of an edge.
    pub fn label(&self, edge: &Edge) -> Option<PinLabel> {
        self.labels.get(edge).copied()
    }

    /// All edge labels.
    pub fn labels(&self) -> &BTreeMap<Edge, PinLabel> {
        &self.labels
    }

    /// Take the queued events.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Add a volume control or a switch.
    pub fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let id = self.registry.create(&mut self.engine, spec, None);
        self.announce(id);
        id
    }

    /// Entry point for decoded audio: creates an idle source.
    pub fn on_decoded_audio(&mut self, buffer: SampleBuffer, name: impl Into<String>) -> NodeId {
        let id = self.registry.create_source(Arc::new(buffer), name);
        self.announce(id);
        id
    }

    /// Decode a dropped file and add it as a source.
    ///
    /// Files of unsupported kinds are skipped (`Ok(None)`); decode failures
    /// are returned and no node is created.
    pub fn ingest<D: AudioDecoder + ?Sized>(
        &mut self,
        file: &DroppedFile,
        decoder: &D,
    ) -> Result<Option<NodeId>> {
        match ingest::decode_file(file, &self.config.accepted_media, decoder) {
            Ok(buffer) => Ok(Some(self.on_decoded_audio(buffer, file.name.clone()))),
            Err(EditorError::UnsupportedMediaKind(mime)) => {
                tracing::warn!(name = %file.name, %mime, "skipping unsupported file");
                Ok(None)
            }
            Err(err) => {
                tracing::error!(%err, "ingestion failed");
                Err(err)
            }
        }
    }

    /// Rename a node.
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.registry.rename(id, name.clone())?;
        self.events.push(EditorEvent::NodeRenamed { node: id, name });
        Ok(())
    }

    /// Select a tool mode. Returns whether the mode changed.
    pub fn select_tool(&mut self, mode: ToolMode) -> bool {
        let had_pending = self.pins.pending().is_some();
        if !self.tools.select(mode, &mut self.pins) {
            return false;
        }
        if had_pending {
            self.events.push(EditorEvent::PendingChanged { pending: None });
        }
        self.events.push(EditorEvent::ModeChanged { mode });
        true
    }

    /// Handle a click on a pin according to the active tool mode.
    pub fn click_pin(&mut self, node: NodeId, lane: Option<Lane>, direction: Direction) -> Result<PinOutcome> {
        match self.tools.mode() {
            ToolMode::Connect => self.connect_click(PinClick {
                node,
                lane,
                direction,
            }),
            ToolMode::Disconnect => {
                let edges = self.disconnect_node(node)?;
                Ok(PinOutcome::Disconnected(edges))
            }
            ToolMode::Bind | ToolMode::Delete => {
                self.registry.node(node)?;
                tracing::debug!(node = %node, mode = %self.tools.mode(), "pin click ignored");
                Ok(PinOutcome::Ignored)
            }
        }
    }

    fn connect_click(&mut self, click: PinClick) -> Result<PinOutcome> {
        let port = self.resolve_pin(click)?;
        let click = PinClick {
            lane: port.lane,
            ..click
        };
        if self.pin_load(port, click.direction) >= self.config.max_pin_labels {
            tracing::debug!(pin = %port, "pin is full, click ignored");
            return Ok(PinOutcome::Ignored);
        }

        match self.pins.click(click) {
            Selection::Pending(pending) => {
                self.events.push(EditorEvent::PendingChanged {
                    pending: Some(pending),
                });
                Ok(PinOutcome::Pending(pending))
            }
            Selection::Replaced { pending, .. } => {
                self.events.push(EditorEvent::PendingChanged {
                    pending: Some(pending),
                });
                Ok(PinOutcome::Replaced(pending))
            }
            Selection::Cancelled(_) => {
                self.events.push(EditorEvent::PendingChanged { pending: None });
                Ok(PinOutcome::Cancelled)
            }
            Selection::Complete { output, input } => {
                self.events.push(EditorEvent::PendingChanged { pending: None });
                match self.link(output.pin_ref(), input.pin_ref())? {
                    (ConnectOutcome::Connected(edge), Some(label)) => {
                        Ok(PinOutcome::Connected { edge, label })
                    }
                    (outcome, _) => Ok(PinOutcome::AlreadyConnected(outcome.edge())),
                }
            }
        }
    }

    fn resolve_pin(&self, click: PinClick) -> Result<Port> {
        let view = normalize(self.registry.node(click.node)?, click.lane)?;
        Ok(view.endpoint(click.direction)?.port)
    }

    /// Labels currently shown on a pin, the pending one included.
    fn pin_load(&self, port: Port, direction: Direction) -> usize {
        let edges = self
            .labels
            .keys()
            .filter(|edge| match direction {
                Direction::Output => edge.from == port,
                Direction::Input => edge.to == port,
            })
            .count();
        let pending = self
            .pins
            .pending()
            .filter(|p| p.node == port.node && p.lane == port.lane && p.direction == direction)
            .is_some();
        edges + usize::from(pending)
    }

    /// Connect two endpoints and label the new edge.
    pub fn connect(&mut self, from: PinRef, to: PinRef) -> Result<ConnectOutcome> {
        Ok(self.link(from, to)?.0)
    }

    fn link(&mut self, from: PinRef, to: PinRef) -> Result<(ConnectOutcome, Option<PinLabel>)> {
        let outcome = connector::connect(&mut self.registry, &mut self.engine, from, to)?;
        self.sync_labels();
        let label = match outcome {
            ConnectOutcome::Connected(edge) => {
                let label = self.pins.commit_label();
                self.labels.insert(edge, label);
                self.events.push(EditorEvent::EdgeCreated { edge, label });
                Some(label)
            }
            ConnectOutcome::AlreadyConnected(_) => None,
        };
        Ok((outcome, label))
    }

    /// Disconnect two endpoints. Returns whether an edge was removed.
    pub fn disconnect(&mut self, from: PinRef, to: PinRef) -> Result<bool> {
        let removed = connector::disconnect(&mut self.registry, &mut self.engine, from, to)?;
        self.sync_labels();
        Ok(removed)
    }

    /// Sever every edge touching a node.
    pub fn disconnect_node(&mut self, id: NodeId) -> Result<Vec<Edge>> {
        let removed = connector::disconnect_all(&mut self.registry, &mut self.engine, id)?;
        self.sync_labels();
        Ok(removed)
    }

    /// Delete a node with all of its edges and engine objects.
    pub fn delete_node(&mut self, id: NodeId) -> Result<Vec<Edge>> {
        let severed = self.registry.delete(&mut self.engine, id)?;
        if self.pins.pending().is_some_and(|p| p.node == id) {
            self.pins.clear();
            self.events.push(EditorEvent::PendingChanged { pending: None });
        }
        self.sync_labels();
        self.events.push(EditorEvent::NodeDeleted { node: id });
        Ok(severed)
    }

    /// Move a volume slider; gain = slider / `gain_slider_max`.
    pub fn set_gain(&mut self, id: NodeId, slider: f32) -> Result<()> {
        let gain = slider / self.config.gain_slider_max;
        self.registry.set_gain(&mut self.engine, id, gain)
    }

    /// Route a switch through `lane`.
    pub fn set_switch(&mut self, id: NodeId, lane: Lane) -> Result<()> {
        self.registry.set_switch(&mut self.engine, id, lane)
    }

    /// Start a source from the beginning.
    pub fn play(&mut self, id: NodeId, looping: bool) -> Result<()> {
        playback::play(&mut self.registry, &mut self.engine, id, looping)?;
        self.playback_changed(id);
        Ok(())
    }

    /// Pause a playing source.
    pub fn pause(&mut self, id: NodeId) -> Result<()> {
        playback::pause(&mut self.registry, &mut self.engine, id)?;
        self.playback_changed(id);
        Ok(())
    }

    /// Resume a paused source.
    pub fn resume(&mut self, id: NodeId) -> Result<()> {
        playback::resume(&mut self.registry, &mut self.engine, id)?;
        self.playback_changed(id);
        Ok(())
    }

    /// Stop a source.
    pub fn stop(&mut self, id: NodeId) -> Result<()> {
        playback::stop(&mut self.registry, &mut self.engine, id)?;
        self.playback_changed(id);
        Ok(())
    }

    /// The play/pause button.
    pub fn toggle_play(&mut self, id: NodeId) -> Result<PlaybackStatus> {
        let status = playback::toggle_play(&mut self.registry, &mut self.engine, id)?;
        self.playback_changed(id);
        Ok(status)
    }

    /// The loop/stop button.
    pub fn toggle_loop(&mut self, id: NodeId) -> Result<PlaybackStatus> {
        let status = playback::toggle_loop(&mut self.registry, &mut self.engine, id)?;
        self.playback_changed(id);
        Ok(status)
    }

    /// Deliver engine ended notifications. Returns sources that went idle.
    pub fn poll_engine(&mut self) -> Vec<NodeId> {
        let mut idle = Vec::new();
        for object in self.engine.drain_ended() {
            if let Some(id) = playback::handle_ended(&mut self.registry, &mut self.engine, object) {
                self.playback_changed(id);
                idle.push(id);
            }
        }
        idle
    }

    fn playback_changed(&mut self, id: NodeId) {
        if let Ok(source) = self.registry.source(id) {
            let status = source.transport().status();
            self.events.push(EditorEvent::PlaybackChanged { node: id, status });
        }
    }

    fn announce(&mut self, id: NodeId) {
        if let Some(node) = self.registry.get(id) {
            self.events.push(EditorEvent::NodeCreated {
                node: id,
                kind: node.tag(),
                name: node.name().to_string(),
            });
        }
    }

    /// Drop labels of edges that no longer exist.
    fn sync_labels(&mut self) {
        let live = connector::edges(&self.registry);
        let gone: Vec<Edge> = self
            .labels
            .keys()
            .filter(|edge| live.binary_search(*edge).is_err())
            .copied()
            .collect();
        for edge in gone {
            self.labels.remove(&edge);
            self.events.push(EditorEvent::EdgeRemoved { edge });
        }
    }
}
