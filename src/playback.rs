//! Source playback controller.
//!
//! Engine playback objects are single-use: once stopped they can never be
//! started again. Every start or resume therefore allocates a fresh object,
//! re-wires it to the source's current outbound edges and starts it at the
//! right buffer offset. Pausing and stopping discard the object.
//!
//! ```text
//! idle --play--> playing --pause--> paused --resume--> playing
//!   ^               |                  |
//!   +-----stop------+-------stop-------+
//! ```

use crate::connector;
use crate::engine::{AudioEngine, EngineNode};
use crate::error::{EditorError, Result};
use crate::node::{NodeId, NodeKind};
use crate::registry::Registry;
use std::fmt;
use std::sync::Arc;

/// Transport status of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Not playing; no engine object.
    #[default]
    Idle,
    /// Playing through a live engine object.
    Playing,
    /// Paused; the offset is saved and no engine object exists.
    Paused,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "idle"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Per-source transport bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transport {
    status: PlaybackStatus,
    looping: bool,
    playback: Option<EngineNode>,
    start_time: f64,
    paused_total: f64,
    pause_start: f64,
    paused_offset: f64,
}

impl Transport {
    /// Current status.
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Whether the current session loops.
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// The live engine playback object, present only while playing.
    pub fn playback(&self) -> Option<EngineNode> {
        self.playback
    }

    /// Buffer offset saved by the last pause, in seconds.
    pub fn paused_offset(&self) -> f64 {
        self.paused_offset
    }

    /// Engine time at which the current session started.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Total time spent paused in the current session.
    pub fn paused_total(&self) -> f64 {
        self.paused_total
    }
}

/// Buffer position reached after playing since `start_time`, minus time
/// spent paused, wrapped into `[0, duration)`.
pub fn playback_offset(now: f64, start_time: f64, paused_total: f64, duration: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() {
        return 0.0;
    }
    (now - start_time - paused_total).rem_euclid(duration)
}

/// Start a source from the beginning. Only legal while idle.
pub fn play<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    id: NodeId,
    looping: bool,
) -> Result<()> {
    let now = engine.current_time();
    let transport = transport_mut(reg, id)?;
    expect_status(id, transport, PlaybackStatus::Idle, "play")?;
    transport.status = PlaybackStatus::Playing;
    transport.looping = looping;
    transport.start_time = now;
    transport.paused_total = 0.0;
    transport.paused_offset = 0.0;
    spawn(reg, engine, id, 0.0)?;
    tracing::info!(node = %id, looping, "playback started");
    Ok(())
}

/// Pause a playing source, saving its offset and discarding its object.
pub fn pause<E: AudioEngine>(reg: &mut Registry, engine: &mut E, id: NodeId) -> Result<()> {
    let now = engine.current_time();
    let duration = reg.source(id)?.buffer.duration();
    let transport = transport_mut(reg, id)?;
    expect_status(id, transport, PlaybackStatus::Playing, "pause")?;
    transport.status = PlaybackStatus::Paused;
    transport.pause_start = now;
    transport.paused_offset =
        playback_offset(now, transport.start_time, transport.paused_total, duration);
    let offset = transport.paused_offset;
    if let Some(object) = transport.playback.take() {
        engine.stop(object);
        engine.release(object);
    }
    tracing::info!(node = %id, offset, "playback paused");
    Ok(())
}

/// Resume a paused source from its saved offset on a fresh object.
pub fn resume<E: AudioEngine>(reg: &mut Registry, engine: &mut E, id: NodeId) -> Result<()> {
    let now = engine.current_time();
    let transport = transport_mut(reg, id)?;
    expect_status(id, transport, PlaybackStatus::Paused, "resume")?;
    transport.status = PlaybackStatus::Playing;
    transport.paused_total += now - transport.pause_start;
    let offset = transport.paused_offset;
    spawn(reg, engine, id, offset)?;
    tracing::info!(node = %id, offset, "playback resumed");
    Ok(())
}

/// Return a playing or paused source to idle, clearing its loop flag.
pub fn stop<E: AudioEngine>(reg: &mut Registry, engine: &mut E, id: NodeId) -> Result<()> {
    let transport = transport_mut(reg, id)?;
    if transport.status == PlaybackStatus::Idle {
        return Err(EditorError::InvalidTransport {
            node: id,
            status: PlaybackStatus::Idle,
            action: "stop",
        });
    }
    reset(transport, engine);
    tracing::info!(node = %id, "playback stopped");
    Ok(())
}

/// The play/pause button: idle plays, playing pauses, paused resumes.
pub fn toggle_play<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    id: NodeId,
) -> Result<PlaybackStatus> {
    match reg.source(id)?.transport.status {
        PlaybackStatus::Idle => play(reg, engine, id, false)?,
        PlaybackStatus::Playing => pause(reg, engine, id)?,
        PlaybackStatus::Paused => resume(reg, engine, id)?,
    }
    Ok(reg.source(id)?.transport.status)
}

/// The loop/stop button: idle starts looping playback, otherwise stops.
pub fn toggle_loop<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    id: NodeId,
) -> Result<PlaybackStatus> {
    match reg.source(id)?.transport.status {
        PlaybackStatus::Idle => play(reg, engine, id, true)?,
        PlaybackStatus::Playing | PlaybackStatus::Paused => stop(reg, engine, id)?,
    }
    Ok(reg.source(id)?.transport.status)
}

/// React to an engine "ended" notification.
///
/// Only the source whose *current* object ended while playing returns to
/// idle. Objects discarded by pause or stop are ignored. Returns the source
/// that went idle, if any.
pub fn handle_ended<E: AudioEngine>(
    reg: &mut Registry,
    engine: &mut E,
    object: EngineNode,
) -> Option<NodeId> {
    let id = reg.iter().find_map(|node| match &node.kind {
        NodeKind::Source(s)
            if s.transport.status == PlaybackStatus::Playing
                && s.transport.playback == Some(object) =>
        {
            Some(node.id)
        }
        _ => None,
    })?;
    let transport = transport_mut(reg, id).ok()?;
    reset(transport, engine);
    tracing::info!(node = %id, "playback ended");
    Some(id)
}

/// Drop any playback state without status checks. Used before deletion.
pub(crate) fn discard<E: AudioEngine>(reg: &mut Registry, engine: &mut E, id: NodeId) {
    if let Ok(transport) = transport_mut(reg, id) {
        reset(transport, engine);
    }
}

fn reset<E: AudioEngine>(transport: &mut Transport, engine: &mut E) {
    if let Some(object) = transport.playback.take() {
        engine.stop(object);
        engine.release(object);
    }
    transport.status = PlaybackStatus::Idle;
    transport.looping = false;
    transport.paused_offset = 0.0;
}

fn spawn<E: AudioEngine>(reg: &mut Registry, engine: &mut E, id: NodeId, offset: f64) -> Result<()> {
    let source = reg.source_mut(id)?;
    let object = engine.create_playback(Arc::clone(&source.buffer), source.transport.looping);
    source.transport.playback = Some(object);
    connector::reapply_outputs(reg, engine, id)?;
    engine.start(object, offset);
    Ok(())
}

fn transport_mut(reg: &mut Registry, id: NodeId) -> Result<&mut Transport> {
    Ok(&mut reg.source_mut(id)?.transport)
}

fn expect_status(
    id: NodeId,
    transport: &Transport,
    expected: PlaybackStatus,
    action: &'static str,
) -> Result<()> {
    if transport.status == expected {
        Ok(())
    } else {
        tracing::warn!(node = %id, status = %transport.status, action, "rejected transport command");
        Err(EditorError::InvalidTransport {
            node: id,
            status: transport.status,
            action,
        })
    }
}
