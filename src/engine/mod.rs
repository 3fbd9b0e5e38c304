//! Engine boundary: the opaque real-time object graph the editor mirrors onto.
//!
//! The editor never processes audio itself. It creates engine objects,
//! attaches and detaches them per logical edge, and starts or stops
//! playback objects. Anything implementing [`AudioEngine`] can sit behind
//! the editor; [`OfflineEngine`] is the deterministic in-process engine.

mod offline;
mod plan;

pub use offline::{EngineObject, OfflineEngine, PlaybackState};
pub use plan::{RenderPlan, PlanError};

use crate::buffer::SampleBuffer;
use std::fmt;
use std::sync::Arc;

/// Opaque handle to an object living inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineNode(pub u32);

impl fmt::Display for EngineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine#{}", self.0)
    }
}

/// The operations the editor needs from an audio engine.
///
/// Attaching an already attached pair must not duplicate the signal path.
/// Calls with handles the engine no longer knows are ignored.
pub trait AudioEngine {
    /// Create a persistent scalar-gain object (unity gain).
    fn create_gain(&mut self) -> EngineNode;

    /// Create a persistent pass-through routing object.
    fn create_routing(&mut self) -> EngineNode;

    /// Create a single-use playback object bound to `buffer`.
    fn create_playback(&mut self, buffer: Arc<SampleBuffer>, looping: bool) -> EngineNode;

    /// The process-wide destination object.
    fn destination(&self) -> EngineNode;

    /// Route the output of `from` into `to`.
    fn attach(&mut self, from: EngineNode, to: EngineNode);

    /// Remove the route from `from` into `to`.
    fn detach(&mut self, from: EngineNode, to: EngineNode);

    /// Set the gain of a gain object.
    fn set_gain(&mut self, node: EngineNode, gain: f32);

    /// Start a playback object `offset` seconds into its buffer.
    fn start(&mut self, node: EngineNode, offset: f64);

    /// Stop a playback object. A stopped object can never be started again.
    fn stop(&mut self, node: EngineNode);

    /// Drop an object and every route touching it.
    fn release(&mut self, node: EngineNode);

    /// Engine clock in seconds.
    fn current_time(&self) -> f64;

    /// Playback objects that ended since the last call, in order.
    fn drain_ended(&mut self) -> Vec<EngineNode>;
}
