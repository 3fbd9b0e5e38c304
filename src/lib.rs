//! Patchbay: the connection core of a pin-driven audio routing editor.
//!
//! A logical graph of sources, volume controls, switches and a single sink is
//! edited through pin clicks and mirrored edge-for-edge onto an audio engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod connector;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod ingest;
#[doc(hidden)]
#[allow(missing_docs)]
pub mod invariant_ppt;
pub mod node;
pub mod normalize;
pub mod pin;
pub mod playback;
pub mod registry;
pub mod session;
pub mod tool;

pub use buffer::SampleBuffer;
pub use config::EditorConfig;
pub use connector::{ConnectOutcome, PinRef};
pub use engine::{AudioEngine, EngineNode, OfflineEngine};
pub use error::{ConfigError, EditorError, Result};
pub use node::{Direction, Edge, KindTag, Lane, NodeId, Port, SwitchOrientation};
pub use pin::{PinClick, PinLabel};
pub use playback::PlaybackStatus;
pub use registry::NodeSpec;
pub use session::{EditorEvent, EditorSession, PinOutcome};
pub use tool::ToolMode;
