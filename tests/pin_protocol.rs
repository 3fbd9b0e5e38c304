use patchbay::invariant_ppt::{contract_test, MODE_EXCLUSIVE, PENDING_SINGLE};
use patchbay::{
    Direction, Edge, EditorConfig, EditorEvent, EditorSession, Lane, NodeSpec, PinClick,
    PinOutcome, Port, SwitchOrientation, ToolMode,
};

fn session_with_gains() -> (EditorSession, patchbay::NodeId, patchbay::NodeId) {
    let mut session = EditorSession::default();
    let a = session.add_node(NodeSpec::Gain);
    let b = session.add_node(NodeSpec::Gain);
    session.drain_events();
    (session, a, b)
}

#[test]
fn same_pin_twice_cancels_without_edge() {
    let (mut session, a, _) = session_with_gains();
    let first = session.click_pin(a, None, Direction::Output).unwrap();
    assert_eq!(first, PinOutcome::Pending(PinClick::output(a, None)));
    let second = session.click_pin(a, None, Direction::Output).unwrap();
    assert_eq!(second, PinOutcome::Cancelled);
    assert!(session.pending().is_none());
    assert!(session.edges().is_empty());
}

#[test]
fn same_direction_replaces_pending() {
    let (mut session, a, b) = session_with_gains();
    session.click_pin(a, None, Direction::Output).unwrap();
    let outcome = session.click_pin(b, None, Direction::Output).unwrap();
    assert_eq!(outcome, PinOutcome::Replaced(PinClick::output(b, None)));
    assert_eq!(session.pending(), Some(PinClick::output(b, None)));
    assert!(session.edges().is_empty());
}

#[test]
fn output_then_input_creates_one_edge() {
    let (mut session, a, b) = session_with_gains();
    session.click_pin(a, None, Direction::Output).unwrap();
    let outcome = session.click_pin(b, None, Direction::Input).unwrap();
    let edge = Edge {
        from: Port::fixed(a),
        to: Port::fixed(b),
    };
    match outcome {
        PinOutcome::Connected { edge: e, label } => {
            assert_eq!(e, edge);
            assert_eq!(label.index, 0);
            assert_eq!(label.glyph, 'a');
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(session.edges(), vec![edge]);
    assert!(session.pending().is_none());
}

#[test]
fn input_then_output_orders_output_as_source() {
    let (mut session, a, b) = session_with_gains();
    session.click_pin(b, None, Direction::Input).unwrap();
    session.click_pin(a, None, Direction::Output).unwrap();
    assert_eq!(
        session.edges(),
        vec![Edge {
            from: Port::fixed(a),
            to: Port::fixed(b)
        }]
    );
}

#[test]
fn opposite_pin_on_same_node_cancels() {
    let mut session = EditorSession::default();
    let sw = session.add_node(NodeSpec::Switch {
        orientation: SwitchOrientation::InputSelect,
    });
    session.click_pin(sw, Some(Lane::Right), Direction::Input).unwrap();
    let outcome = session.click_pin(sw, None, Direction::Output).unwrap();
    assert_eq!(outcome, PinOutcome::Cancelled);
    assert!(session.edges().is_empty());
}

#[test]
fn labels_advance_only_on_new_edges() {
    let (mut session, a, b) = session_with_gains();
    let sink = session.sink();
    session.click_pin(a, None, Direction::Output).unwrap();
    session.click_pin(b, None, Direction::Input).unwrap();
    // Same pair again: no new label.
    session.click_pin(a, None, Direction::Output).unwrap();
    let again = session.click_pin(b, None, Direction::Input).unwrap();
    assert!(matches!(again, PinOutcome::AlreadyConnected(_)));
    // A new pair takes the next label.
    session.click_pin(sink, None, Direction::Input).unwrap();
    session.click_pin(b, None, Direction::Output).unwrap();

    let labels: Vec<char> = session.labels().values().map(|l| l.glyph).collect();
    assert_eq!(labels, vec!['a', 'b']);
}

#[test]
fn stale_pin_click_is_rejected() {
    let mut session = EditorSession::default();
    let a = session.add_node(NodeSpec::Gain);
    let sw = session.add_node(NodeSpec::Switch {
        orientation: SwitchOrientation::InputSelect,
    });
    session.delete_node(sw).unwrap();
    assert!(session.click_pin(sw, None, Direction::Input).is_err());
    session.click_pin(a, None, Direction::Output).unwrap();
    assert!(session.pending().is_some());
}

#[test]
fn full_pin_ignores_clicks() {
    let mut session = EditorSession::new(EditorConfig {
        max_pin_labels: 2,
        ..Default::default()
    });
    let hub = session.add_node(NodeSpec::Gain);
    let targets: Vec<_> = (0..3).map(|_| session.add_node(NodeSpec::Gain)).collect();
    for &t in &targets[..2] {
        session.click_pin(hub, None, Direction::Output).unwrap();
        session.click_pin(t, None, Direction::Input).unwrap();
    }
    assert_eq!(
        session.click_pin(hub, None, Direction::Output).unwrap(),
        PinOutcome::Ignored
    );
    assert!(session.pending().is_none());
    // The hub's input pin is a different pin and still free.
    assert!(matches!(
        session.click_pin(hub, None, Direction::Input).unwrap(),
        PinOutcome::Pending(_)
    ));
}

#[test]
fn switch_pin_without_lane_resolves_to_active_lane() {
    let mut session = EditorSession::default();
    let a = session.add_node(NodeSpec::Gain);
    let sw = session.add_node(NodeSpec::Switch {
        orientation: SwitchOrientation::InputSelect,
    });
    session.set_switch(sw, Lane::Right).unwrap();
    session.click_pin(a, None, Direction::Output).unwrap();
    session.click_pin(sw, None, Direction::Input).unwrap();
    assert_eq!(
        session.edges(),
        vec![Edge {
            from: Port::fixed(a),
            to: Port::on_lane(sw, Lane::Right)
        }]
    );
}

#[test]
fn mode_change_clears_pending_selection() {
    let (mut session, a, b) = session_with_gains();
    session.click_pin(a, None, Direction::Output).unwrap();
    assert!(session.select_tool(ToolMode::Delete));
    assert!(session.pending().is_none());
    assert!(session.select_tool(ToolMode::Connect));
    // Starts fresh instead of completing a -> b.
    let outcome = session.click_pin(b, None, Direction::Input).unwrap();
    assert!(matches!(outcome, PinOutcome::Pending(_)));
    assert!(session.edges().is_empty());

    let events = session.drain_events();
    assert!(events.contains(&EditorEvent::ModeChanged {
        mode: ToolMode::Delete
    }));
    assert!(events.contains(&EditorEvent::PendingChanged { pending: None }));
}

#[test]
fn reselecting_mode_is_a_noop() {
    let (mut session, a, _) = session_with_gains();
    session.click_pin(a, None, Direction::Output).unwrap();
    session.drain_events();
    assert!(!session.select_tool(ToolMode::Connect));
    assert!(session.pending().is_some());
    assert!(session.drain_events().is_empty());
}

#[test]
fn disconnect_mode_severs_all_edges_on_node() {
    let (mut session, a, b) = session_with_gains();
    let sink = session.sink();
    session.click_pin(a, None, Direction::Output).unwrap();
    session.click_pin(b, None, Direction::Input).unwrap();
    session.click_pin(b, None, Direction::Output).unwrap();
    session.click_pin(sink, None, Direction::Input).unwrap();
    assert_eq!(session.edges().len(), 2);

    session.select_tool(ToolMode::Disconnect);
    match session.click_pin(b, None, Direction::Input).unwrap() {
        PinOutcome::Disconnected(edges) => assert_eq!(edges.len(), 2),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(session.edges().is_empty());
    assert!(session.labels().is_empty());
    assert!(session.pending().is_none());
}

#[test]
fn pin_contract() {
    let (mut session, a, _) = session_with_gains();
    session.click_pin(a, None, Direction::Output).unwrap();
    session.select_tool(ToolMode::Bind);
    contract_test("pin protocol", &[PENDING_SINGLE, MODE_EXCLUSIVE]);
}
