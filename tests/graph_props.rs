use patchbay::connector::{self, PinRef};
use patchbay::normalize::normalize;
use patchbay::{
    Direction, EditorSession, EngineNode, Lane, NodeId, NodeSpec, SampleBuffer,
    SwitchOrientation,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Connect(usize, Option<Lane>, usize, Option<Lane>),
    Disconnect(usize, Option<Lane>, usize, Option<Lane>),
    DisconnectAll(usize),
    Delete(usize),
    Switch(usize, Lane),
}

fn lane() -> impl Strategy<Value = Option<Lane>> {
    prop_oneof![
        Just(None),
        Just(Some(Lane::Left)),
        Just(Some(Lane::Right)),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..7usize, lane(), 0..7usize, lane()).prop_map(|(a, la, b, lb)| Op::Connect(a, la, b, lb)),
        2 => (0..7usize, lane(), 0..7usize, lane()).prop_map(|(a, la, b, lb)| Op::Disconnect(a, la, b, lb)),
        1 => (0..7usize).prop_map(Op::DisconnectAll),
        1 => (0..7usize).prop_map(Op::Delete),
        1 => (0..7usize, prop_oneof![Just(Lane::Left), Just(Lane::Right)]).prop_map(|(n, l)| Op::Switch(n, l)),
    ]
}

fn build() -> (EditorSession, Vec<NodeId>) {
    let mut session = EditorSession::default();
    let mut ids = vec![session.sink()];
    ids.push(session.add_node(NodeSpec::Gain));
    ids.push(session.add_node(NodeSpec::Gain));
    ids.push(session.add_node(NodeSpec::Switch {
        orientation: SwitchOrientation::InputSelect,
    }));
    ids.push(session.add_node(NodeSpec::Switch {
        orientation: SwitchOrientation::OutputSelect,
    }));
    ids.push(session.on_decoded_audio(SampleBuffer::silence(1.0, 100), "a.wav"));
    let playing = session.on_decoded_audio(SampleBuffer::silence(1.0, 100), "b.wav");
    session.play(playing, true).unwrap();
    ids.push(playing);
    (session, ids)
}

/// Engine routes the logical graph implies: one per edge with live objects,
/// plus each switch's internal route.
fn expected_attachments(session: &EditorSession) -> BTreeSet<(EngineNode, EngineNode)> {
    let reg = session.registry();
    let mut expected = BTreeSet::new();
    for node in reg.iter() {
        if let Some(sw) = node.as_switch() {
            let lane = sw.lane_object(sw.active());
            expected.insert(match sw.orientation() {
                SwitchOrientation::InputSelect => (lane, sw.common_object()),
                SwitchOrientation::OutputSelect => (sw.common_object(), lane),
            });
        }
    }
    for edge in session.edges() {
        let from = normalize(reg.node(edge.from.node).unwrap(), edge.from.lane)
            .unwrap()
            .endpoint(Direction::Output)
            .unwrap()
            .engine;
        let to = normalize(reg.node(edge.to.node).unwrap(), edge.to.lane)
            .unwrap()
            .endpoint(Direction::Input)
            .unwrap()
            .engine;
        if let (Some(a), Some(b)) = (from, to) {
            expected.insert((a, b));
        }
    }
    expected
}

proptest! {
    #[test]
    fn adjacency_and_engine_stay_in_agreement(ops in prop::collection::vec(op(), 1..40)) {
        let (mut session, ids) = build();
        for op in ops {
            let before = session.edges();
            let result = match op {
                Op::Connect(a, la, b, lb) => session
                    .connect(PinRef { node: ids[a], lane: la }, PinRef { node: ids[b], lane: lb })
                    .map(|_| ()),
                Op::Disconnect(a, la, b, lb) => session
                    .disconnect(PinRef { node: ids[a], lane: la }, PinRef { node: ids[b], lane: lb })
                    .map(|_| ()),
                Op::DisconnectAll(n) => session.disconnect_node(ids[n]).map(|_| ()),
                Op::Delete(n) => session.delete_node(ids[n]).map(|_| ()),
                Op::Switch(n, lane) => session.set_switch(ids[n], lane),
            };
            if result.is_err() {
                prop_assert_eq!(session.edges(), before);
            }
            prop_assert!(connector::is_consistent(session.registry()));
            prop_assert_eq!(session.engine().attachments(), &expected_attachments(&session));
            let labelled: Vec<_> = session.labels().keys().copied().collect();
            prop_assert_eq!(labelled, session.edges());
        }
    }

    #[test]
    fn repeated_connect_is_idempotent(a in 1..5usize, b in 0..5usize, la in lane(), lb in lane()) {
        let (mut session, ids) = build();
        let from = PinRef { node: ids[a], lane: la };
        let to = PinRef { node: ids[b], lane: lb };
        if session.connect(from, to).is_ok() {
            let edges = session.edges();
            let attachments = session.engine().attachments().clone();
            session.connect(from, to).unwrap();
            prop_assert_eq!(session.edges(), edges);
            prop_assert_eq!(session.engine().attachments(), &attachments);
        }
    }
}
