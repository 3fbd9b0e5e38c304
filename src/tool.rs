//! Tool mode controller.

use crate::invariant_ppt::{assert_invariant, MODE_EXCLUSIVE};
use crate::pin::PinSelector;
use std::fmt;

/// The editing tool; exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolMode {
    /// Pin clicks build edges.
    #[default]
    Connect,
    /// A pin click severs every edge on its node.
    Disconnect,
    /// Reserved; pin clicks do nothing.
    Bind,
    /// Reserved; pin clicks do nothing.
    Delete,
}

impl ToolMode {
    /// All modes, in toolbar order.
    pub const ALL: [ToolMode; 4] = [
        ToolMode::Connect,
        ToolMode::Disconnect,
        ToolMode::Bind,
        ToolMode::Delete,
    ];
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolMode::Connect => "connect",
            ToolMode::Disconnect => "disconnect",
            ToolMode::Bind => "bind",
            ToolMode::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Holds the active mode.
#[derive(Debug, Clone, Default)]
pub struct ToolController {
    mode: ToolMode,
}

impl ToolController {
    /// Controller in connect mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active mode.
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// Switch modes. Reselecting the active mode is a no-op; any real
    /// change clears the pending pin. Returns whether the mode changed.
    pub fn select(&mut self, mode: ToolMode, pins: &mut PinSelector) -> bool {
        if mode == self.mode {
            return false;
        }
        pins.clear();
        let previous = self.mode;
        self.mode = mode;
        assert_invariant(
            MODE_EXCLUSIVE,
            self.mode == mode && pins.pending().is_none(),
            "Mode change must leave one mode and no pending pin",
            Some("select"),
        );
        tracing::debug!(from = %previous, to = %mode, "tool mode changed");
        true
    }
}
