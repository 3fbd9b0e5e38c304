//! Offline engine: a deterministic, single-threaded object graph with a
//! manual clock and block rendering.

// The clock only moves through `advance` and `render`, so every test and
// every render is reproducible.

use super::plan::{PlanError, RenderPlan};
use super::{AudioEngine, EngineNode};
use crate::buffer::SampleBuffer;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Lifecycle of a playback object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    /// Created, not started yet.
    Created,
    /// Producing samples.
    Playing {
        /// Engine time at which `start` was called.
        started_at: f64,
        /// Buffer position at `started_at`, in seconds.
        offset: f64,
    },
    /// Stopped or ended; cannot be restarted.
    Stopped,
}

/// An object inside the offline engine.
#[derive(Debug, Clone)]
pub enum EngineObject {
    /// Scalar gain.
    Gain {
        /// Linear gain factor.
        gain: f32,
    },
    /// Pass-through.
    Routing,
    /// Single-use sample player.
    Playback {
        /// Buffer being played.
        buffer: Arc<SampleBuffer>,
        /// Whether playback wraps around at the end.
        looping: bool,
        /// Lifecycle state.
        state: PlaybackState,
    },
    /// The audio destination.
    Destination,
}

/// In-process engine used for tests, benches and offline rendering.
#[derive(Debug)]
pub struct OfflineEngine {
    sample_rate: u32,
    block_size: usize,
    time: f64,
    next_id: u32,
    objects: BTreeMap<EngineNode, EngineObject>,
    attachments: BTreeSet<(EngineNode, EngineNode)>,
    destination: EngineNode,
    ended: Vec<EngineNode>,
}

impl OfflineEngine {
    /// Create an engine with a destination object and the clock at zero.
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        let destination = EngineNode(0);
        let mut objects = BTreeMap::new();
        objects.insert(destination, EngineObject::Destination);
        Self {
            sample_rate: sample_rate.max(1),
            block_size: block_size.max(1),
            time: 0.0,
            next_id: 1,
            objects,
            attachments: BTreeSet::new(),
            destination,
            ended: Vec::new(),
        }
    }

    /// Engine sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Look up an object.
    pub fn object(&self, node: EngineNode) -> Option<&EngineObject> {
        self.objects.get(&node)
    }

    /// Number of live objects, destination included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Whether `from` is routed into `to`.
    pub fn is_attached(&self, from: EngineNode, to: EngineNode) -> bool {
        self.attachments.contains(&(from, to))
    }

    /// All routes, ordered.
    pub fn attachments(&self) -> &BTreeSet<(EngineNode, EngineNode)> {
        &self.attachments
    }

    /// Routes leaving `from`.
    pub fn attachments_from(&self, from: EngineNode) -> impl Iterator<Item = EngineNode> + '_ {
        self.attachments
            .iter()
            .filter(move |(f, _)| *f == from)
            .map(|&(_, to)| to)
    }

    /// Playback state of a playback object.
    pub fn playback_state(&self, node: EngineNode) -> Option<PlaybackState> {
        match self.objects.get(&node) {
            Some(EngineObject::Playback { state, .. }) => Some(*state),
            _ => None,
        }
    }

    /// Move the clock forward, ending playback objects that ran out.
    pub fn advance(&mut self, seconds: f64) {
        self.time += seconds.max(0.0);
        self.collect_ended();
    }

    /// Render `frames` of the destination mix, advancing the clock.
    pub fn render(&mut self, frames: usize) -> Result<Vec<f32>, PlanError> {
        let plan = self.plan()?;
        let mut output = Vec::with_capacity(frames);
        let mut offset = 0;
        while offset < frames {
            let len = self.block_size.min(frames - offset);
            let block = self.render_block(&plan, len);
            output.extend_from_slice(&block);
            self.advance(len as f64 / self.sample_rate as f64);
            offset += len;
        }
        Ok(output)
    }

    /// Compile the current object graph.
    pub fn plan(&self) -> Result<RenderPlan, PlanError> {
        let objects = self.objects.keys().copied().collect();
        RenderPlan::compile(&objects, &self.attachments)
    }

    fn render_block(&self, plan: &RenderPlan, len: usize) -> Vec<f32> {
        let rate = self.sample_rate as f64;
        let mut outputs: BTreeMap<EngineNode, Vec<f32>> = BTreeMap::new();

        for &node in &plan.order {
            let mut mixed = vec![0.0f32; len];
            if let Some(inputs) = plan.inputs.get(&node) {
                for input in inputs {
                    if let Some(signal) = outputs.get(input) {
                        for (m, s) in mixed.iter_mut().zip(signal) {
                            *m += s;
                        }
                    }
                }
            }

            let produced = match self.objects.get(&node) {
                Some(EngineObject::Gain { gain }) => {
                    mixed.iter_mut().for_each(|s| *s *= gain);
                    mixed
                }
                Some(EngineObject::Routing) | Some(EngineObject::Destination) => mixed,
                Some(EngineObject::Playback {
                    buffer,
                    looping,
                    state: PlaybackState::Playing { started_at, offset },
                }) => (0..len)
                    .map(|i| {
                        let t = self.time + i as f64 / rate;
                        if t < *started_at {
                            0.0
                        } else {
                            buffer.sample_at(offset + (t - started_at), *looping)
                        }
                    })
                    .collect(),
                _ => vec![0.0; len],
            };
            outputs.insert(node, produced);
        }

        outputs
            .remove(&self.destination)
            .unwrap_or_else(|| vec![0.0; len])
    }

    fn collect_ended(&mut self) {
        let now = self.time;
        for (&node, object) in self.objects.iter_mut() {
            if let EngineObject::Playback {
                buffer,
                looping: false,
                state,
            } = object
            {
                if let PlaybackState::Playing { started_at, offset } = *state {
                    if offset + (now - started_at) >= buffer.duration() {
                        *state = PlaybackState::Stopped;
                        self.ended.push(node);
                    }
                }
            }
        }
    }

    fn allocate(&mut self, object: EngineObject) -> EngineNode {
        let node = EngineNode(self.next_id);
        self.next_id += 1;
        self.objects.insert(node, object);
        node
    }
}

impl Default for OfflineEngine {
    fn default() -> Self {
        Self::new(48_000, 128)
    }
}

impl AudioEngine for OfflineEngine {
    fn create_gain(&mut self) -> EngineNode {
        self.allocate(EngineObject::Gain { gain: 1.0 })
    }

    fn create_routing(&mut self) -> EngineNode {
        self.allocate(EngineObject::Routing)
    }

    fn create_playback(&mut self, buffer: Arc<SampleBuffer>, looping: bool) -> EngineNode {
        self.allocate(EngineObject::Playback {
            buffer,
            looping,
            state: PlaybackState::Created,
        })
    }

    fn destination(&self) -> EngineNode {
        self.destination
    }

    fn attach(&mut self, from: EngineNode, to: EngineNode) {
        if !self.objects.contains_key(&from) || !self.objects.contains_key(&to) {
            tracing::warn!("attach {from} -> {to}: unknown engine object");
            return;
        }
        self.attachments.insert((from, to));
    }

    fn detach(&mut self, from: EngineNode, to: EngineNode) {
        self.attachments.remove(&(from, to));
    }

    fn set_gain(&mut self, node: EngineNode, gain: f32) {
        match self.objects.get_mut(&node) {
            Some(EngineObject::Gain { gain: g }) => *g = gain,
            _ => tracing::warn!("set_gain on {node}: not a gain object"),
        }
    }

    fn start(&mut self, node: EngineNode, offset: f64) {
        let now = self.time;
        match self.objects.get_mut(&node) {
            Some(EngineObject::Playback { state, .. }) if *state == PlaybackState::Created => {
                *state = PlaybackState::Playing {
                    started_at: now,
                    offset: offset.max(0.0),
                };
            }
            _ => tracing::warn!("start on {node}: not a fresh playback object"),
        }
        self.collect_ended();
    }

    fn stop(&mut self, node: EngineNode) {
        if let Some(EngineObject::Playback { state, .. }) = self.objects.get_mut(&node) {
            if matches!(state, PlaybackState::Playing { .. }) {
                self.ended.push(node);
            }
            *state = PlaybackState::Stopped;
        }
    }

    fn release(&mut self, node: EngineNode) {
        if node == self.destination {
            return;
        }
        self.objects.remove(&node);
        self.attachments.retain(|&(f, t)| f != node && t != node);
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn drain_ended(&mut self) -> Vec<EngineNode> {
        std::mem::take(&mut self.ended)
    }
}
