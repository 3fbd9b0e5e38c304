//! Pin selection protocol: turns single pin clicks into connect requests.
//!
//! At most one pin is pending at a time. The selector is a pure state
//! machine; the session decides what to do with a completed pair.

use crate::connector::PinRef;
use crate::invariant_ppt::{assert_invariant, PENDING_SINGLE};
use crate::node::{Direction, Lane, NodeId};

/// Glyphs used for pin labels unless configured otherwise.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// A click on one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinClick {
    /// Node owning the pin.
    pub node: NodeId,
    /// Switch lane of the pin, if any.
    pub lane: Option<Lane>,
    /// Whether the pin is an input or an output.
    pub direction: Direction,
}

impl PinClick {
    /// Click on an input pin.
    pub fn input(node: NodeId, lane: Option<Lane>) -> Self {
        Self {
            node,
            lane,
            direction: Direction::Input,
        }
    }

    /// Click on an output pin.
    pub fn output(node: NodeId, lane: Option<Lane>) -> Self {
        Self {
            node,
            lane,
            direction: Direction::Output,
        }
    }

    /// The endpoint this pin addresses.
    pub fn pin_ref(&self) -> PinRef {
        PinRef {
            node: self.node,
            lane: self.lane,
        }
    }
}

/// A sequential connection label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinLabel {
    /// Sequence number.
    pub index: usize,
    /// Glyph shown on both pins of the edge.
    pub glyph: char,
}

/// What a click did to the pending slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The pin is now pending.
    Pending(PinClick),
    /// A pin of the same direction replaced the pending one.
    Replaced {
        /// The pin that was pending.
        previous: PinClick,
        /// The new pending pin.
        pending: PinClick,
    },
    /// The pending pin was dropped without a connection.
    Cancelled(PinClick),
    /// An output and an input pin on different nodes were paired.
    Complete {
        /// Output side of the prospective edge.
        output: PinClick,
        /// Input side of the prospective edge.
        input: PinClick,
    },
}

/// The single-slot pending pin state machine.
#[derive(Debug, Clone)]
pub struct PinSelector {
    pending: Option<PinClick>,
    next_label: usize,
    alphabet: Vec<char>,
}

impl PinSelector {
    /// Create a selector; an empty alphabet falls back to a-z.
    pub fn new(alphabet: &str) -> Self {
        let mut glyphs: Vec<char> = alphabet.chars().collect();
        if glyphs.is_empty() {
            glyphs = DEFAULT_ALPHABET.chars().collect();
        }
        Self {
            pending: None,
            next_label: 0,
            alphabet: glyphs,
        }
    }

    /// The pending pin, if any.
    pub fn pending(&self) -> Option<PinClick> {
        self.pending
    }

    /// Feed one click.
    pub fn click(&mut self, click: PinClick) -> Selection {
        let selection = match self.pending.take() {
            None => {
                self.pending = Some(click);
                Selection::Pending(click)
            }
            Some(previous) if previous.direction == click.direction => {
                if previous == click {
                    Selection::Cancelled(previous)
                } else {
                    self.pending = Some(click);
                    Selection::Replaced {
                        previous,
                        pending: click,
                    }
                }
            }
            // Opposite direction on the same node, any lane.
            Some(previous) if previous.node == click.node => Selection::Cancelled(previous),
            Some(previous) => {
                let (output, input) = match click.direction {
                    Direction::Output => (click, previous),
                    Direction::Input => (previous, click),
                };
                Selection::Complete { output, input }
            }
        };
        assert_invariant(
            PENDING_SINGLE,
            match selection {
                Selection::Pending(p) | Selection::Replaced { pending: p, .. } => {
                    self.pending == Some(p)
                }
                Selection::Cancelled(_) | Selection::Complete { .. } => self.pending.is_none(),
            },
            "Pending slot must hold exactly the selected pin",
            Some("click"),
        );
        selection
    }

    /// Drop the pending pin.
    pub fn clear(&mut self) -> Option<PinClick> {
        self.pending.take()
    }

    /// The label the next completed connection will get.
    pub fn peek_label(&self) -> PinLabel {
        self.label(self.next_label)
    }

    /// Hand out the next label and advance the sequence.
    pub fn commit_label(&mut self) -> PinLabel {
        let label = self.label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Label for a sequence number; glyphs cycle through the alphabet.
    pub fn label(&self, index: usize) -> PinLabel {
        PinLabel {
            index,
            glyph: self.alphabet[index % self.alphabet.len()],
        }
    }
}

impl Default for PinSelector {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHABET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: NodeId = NodeId(1);
    const B: NodeId = NodeId(2);

    #[test]
    fn same_pin_twice_cancels() {
        let mut sel = PinSelector::default();
        let a = PinClick::output(A, None);
        assert_eq!(sel.click(a), Selection::Pending(a));
        assert_eq!(sel.click(a), Selection::Cancelled(a));
        assert_eq!(sel.pending(), None);
    }

    #[test]
    fn same_direction_replaces() {
        let mut sel = PinSelector::default();
        let a = PinClick::output(A, None);
        let b = PinClick::output(B, None);
        sel.click(a);
        assert_eq!(
            sel.click(b),
            Selection::Replaced {
                previous: a,
                pending: b
            }
        );
        assert_eq!(sel.pending(), Some(b));
    }

    #[test]
    fn different_lane_is_a_different_pin() {
        let mut sel = PinSelector::default();
        let left = PinClick::input(A, Some(Lane::Left));
        let right = PinClick::input(A, Some(Lane::Right));
        sel.click(left);
        assert!(matches!(sel.click(right), Selection::Replaced { .. }));
    }

    #[test]
    fn opposite_direction_orders_output_first() {
        let mut sel = PinSelector::default();
        let input = PinClick::input(B, None);
        let output = PinClick::output(A, None);
        sel.click(input);
        assert_eq!(sel.click(output), Selection::Complete { output, input });
        assert_eq!(sel.pending(), None);
    }

    #[test]
    fn opposite_direction_same_node_cancels() {
        let mut sel = PinSelector::default();
        let out = PinClick::output(A, Some(Lane::Left));
        sel.click(out);
        assert_eq!(sel.click(PinClick::input(A, None)), Selection::Cancelled(out));
    }

    #[test]
    fn labels_cycle_through_alphabet() {
        let mut sel = PinSelector::new("xy");
        assert_eq!(sel.commit_label().glyph, 'x');
        assert_eq!(sel.commit_label().glyph, 'y');
        assert_eq!(sel.peek_label(), PinLabel { index: 2, glyph: 'x' });
        assert_eq!(PinSelector::new("").label(27).glyph, 'b');
    }
}
