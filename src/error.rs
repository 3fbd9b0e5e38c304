//! Error types for the editor core and its configuration.

use crate::node::{Direction, KindTag, NodeId};
use crate::playback::PlaybackStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by editor operations.
///
/// Every failure is synchronous and leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    /// A dropped file is not an accepted audio type.
    #[error("unsupported media kind: {0}")]
    UnsupportedMediaKind(String),

    /// An accepted file could not be decoded.
    #[error("failed to decode '{name}': {reason}")]
    DecodeFailure {
        /// Display name of the file.
        name: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The endpoint has no capability in the requested direction.
    #[error("{node} has no {direction} endpoint")]
    IncompatibleEndpoint {
        /// Node that lacks the capability.
        node: NodeId,
        /// Direction that was requested.
        direction: Direction,
    },

    /// No node with this id exists (never existed or was deleted).
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The node has no lane with this index.
    #[error("{node} has no lane {lane}")]
    UnknownLane {
        /// Node the lane was looked up on.
        node: NodeId,
        /// Requested lane index.
        lane: usize,
    },

    /// A lane was given on the fixed side of a switch.
    #[error("{node} has a fixed {direction} side; no lane may be given there")]
    FixedSideLane {
        /// Switch node.
        node: NodeId,
        /// The fixed side.
        direction: Direction,
    },

    /// Both endpoints belong to the same node.
    #[error("cannot connect {0} to itself")]
    SelfLoop(NodeId),

    /// The operation needs a different node kind.
    #[error("{node} is not a {expected} node")]
    WrongKind {
        /// Node the operation targeted.
        node: NodeId,
        /// Kind the operation requires.
        expected: KindTag,
    },

    /// The node cannot be deleted.
    #[error("{0} is permanent and cannot be deleted")]
    PermanentNode(NodeId),

    /// A transport command that is not legal in the current state.
    #[error("cannot {action} {node} while {status}")]
    InvalidTransport {
        /// Source node.
        node: NodeId,
        /// Current transport status.
        status: PlaybackStatus,
        /// Rejected action.
        action: &'static str,
    },
}

/// Convenience result type for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field holds an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn incompatible_endpoint_display() {
        let err = EditorError::IncompatibleEndpoint {
            node: NodeId(3),
            direction: Direction::Input,
        };
        assert_eq!(err.to_string(), "node-3 has no input endpoint");
    }

    #[test]
    fn transport_display() {
        let err = EditorError::InvalidTransport {
            node: NodeId(1),
            status: PlaybackStatus::Paused,
            action: "loop",
        };
        assert_eq!(err.to_string(), "cannot loop node-1 while paused");
    }

    #[test]
    fn read_file_source_is_some() {
        let err = ConfigError::ReadFile {
            path: PathBuf::from("/x"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/x"));
    }
}
