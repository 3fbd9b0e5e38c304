use patchbay::engine::{EngineObject, PlaybackState};
use patchbay::invariant_ppt::{contract_test, OUTPUTS_REAPPLIED};
use patchbay::{
    AudioEngine, EditorError, EditorEvent, EditorSession, NodeId, NodeSpec, PinRef, PlaybackStatus,
    SampleBuffer,
};

const RATE: u32 = 100;

fn session_with_source(seconds: f64) -> (EditorSession, NodeId) {
    let mut session = EditorSession::default();
    let src = session.on_decoded_audio(
        SampleBuffer::new(vec![1.0; (seconds * RATE as f64) as usize], RATE),
        "clip.wav",
    );
    (session, src)
}

fn transport(session: &EditorSession, src: NodeId) -> &patchbay::playback::Transport {
    session.registry().source(src).unwrap().transport()
}

#[test]
fn pause_offset_matches_elapsed_time() {
    let (mut session, src) = session_with_source(10.0);
    session.play(src, false).unwrap();
    session.advance(3.5);
    session.pause(src).unwrap();
    let t = transport(&session, src);
    assert_eq!(t.status(), PlaybackStatus::Paused);
    assert!((t.paused_offset() - 3.5).abs() < 1e-9);
    assert!(t.playback().is_none());

    session.advance(2.0);
    session.resume(src).unwrap();
    let object = transport(&session, src).playback().unwrap();
    match session.engine().playback_state(object) {
        Some(PlaybackState::Playing { started_at, offset }) => {
            assert!((started_at - 5.5).abs() < 1e-9);
            assert!((offset - 3.5).abs() < 1e-9);
        }
        other => panic!("unexpected state {other:?}"),
    }
    assert!((transport(&session, src).paused_total() - 2.0).abs() < 1e-9);
}

#[test]
fn second_pause_excludes_paused_time() {
    let (mut session, src) = session_with_source(10.0);
    session.play(src, false).unwrap();
    session.advance(1.0);
    session.pause(src).unwrap();
    session.advance(4.0);
    session.resume(src).unwrap();
    session.advance(2.0);
    session.pause(src).unwrap();
    assert!((transport(&session, src).paused_offset() - 3.0).abs() < 1e-9);
}

#[test]
fn looping_flag_survives_pause_and_resume() {
    let (mut session, src) = session_with_source(1.0);
    assert_eq!(session.toggle_loop(src).unwrap(), PlaybackStatus::Playing);
    assert!(transport(&session, src).is_looping());
    session.advance(2.5);
    assert_eq!(session.toggle_play(src).unwrap(), PlaybackStatus::Paused);
    assert!((transport(&session, src).paused_offset() - 0.5).abs() < 1e-9);
    assert_eq!(session.toggle_play(src).unwrap(), PlaybackStatus::Playing);

    let t = transport(&session, src);
    assert!(t.is_looping());
    let object = t.playback().unwrap();
    assert!(matches!(
        session.engine().object(object),
        Some(EngineObject::Playback { looping: true, .. })
    ));
    // Looping playback never ends on its own.
    assert!(session.advance(10.0).is_empty());
}

#[test]
fn every_resume_rewires_current_outputs() {
    let (mut session, src) = session_with_source(10.0);
    let gain = session.add_node(NodeSpec::Gain);
    let sink = session.sink();
    session.connect(PinRef::node(src), PinRef::node(gain)).unwrap();
    session.connect(PinRef::node(gain), PinRef::node(sink)).unwrap();
    let gain_object = session.node(gain).unwrap().as_gain().unwrap().object();

    session.play(src, false).unwrap();
    let first = transport(&session, src).playback().unwrap();
    assert!(session.engine().is_attached(first, gain_object));

    session.pause(src).unwrap();
    assert!(session.engine().object(first).is_none());
    // Wiring changes while paused are picked up on resume.
    session.connect(PinRef::node(src), PinRef::node(sink)).unwrap();
    session.resume(src).unwrap();

    let second = transport(&session, src).playback().unwrap();
    assert_ne!(first, second);
    assert!(session.engine().is_attached(second, gain_object));
    assert!(session
        .engine()
        .is_attached(second, session.engine().destination()));
    contract_test("resume rewiring", &[OUTPUTS_REAPPLIED]);
}

#[test]
fn disconnect_while_playing_detaches_live_object() {
    let (mut session, src) = session_with_source(10.0);
    let sink = session.sink();
    session.connect(PinRef::node(src), PinRef::node(sink)).unwrap();
    session.play(src, false).unwrap();
    let object = transport(&session, src).playback().unwrap();
    let dest = session.engine().destination();
    assert!(session.engine().is_attached(object, dest));
    assert!(session.disconnect(PinRef::node(src), PinRef::node(sink)).unwrap());
    assert!(!session.engine().is_attached(object, dest));
}

#[test]
fn natural_end_returns_to_idle() {
    let (mut session, src) = session_with_source(1.0);
    session.play(src, false).unwrap();
    session.drain_events();
    assert!(session.advance(0.5).is_empty());
    assert_eq!(session.advance(0.6), vec![src]);
    let t = transport(&session, src);
    assert_eq!(t.status(), PlaybackStatus::Idle);
    assert!(t.playback().is_none());
    assert_eq!(
        session.drain_events(),
        vec![EditorEvent::PlaybackChanged {
            node: src,
            status: PlaybackStatus::Idle
        }]
    );
}

#[test]
fn ended_while_paused_is_ignored() {
    let (mut session, src) = session_with_source(1.0);
    session.play(src, false).unwrap();
    session.advance(0.5);
    session.pause(src).unwrap();
    assert!(session.advance(5.0).is_empty());
    assert_eq!(transport(&session, src).status(), PlaybackStatus::Paused);
}

#[test]
fn stop_clears_flags_from_any_active_state() {
    let (mut session, src) = session_with_source(1.0);
    session.play(src, true).unwrap();
    session.pause(src).unwrap();
    assert_eq!(session.toggle_loop(src).unwrap(), PlaybackStatus::Idle);
    let t = transport(&session, src);
    assert!(!t.is_looping());
    assert!(t.playback().is_none());
    assert!(session.poll_engine().is_empty());

    session.play(src, false).unwrap();
    session.stop(src).unwrap();
    assert_eq!(transport(&session, src).status(), PlaybackStatus::Idle);
}

#[test]
fn illegal_transitions_are_rejected() {
    let (mut session, src) = session_with_source(1.0);
    assert_eq!(
        session.pause(src),
        Err(EditorError::InvalidTransport {
            node: src,
            status: PlaybackStatus::Idle,
            action: "pause"
        })
    );
    assert!(session.resume(src).is_err());
    assert!(session.stop(src).is_err());
    session.play(src, false).unwrap();
    assert!(matches!(
        session.play(src, true),
        Err(EditorError::InvalidTransport { action: "play", .. })
    ));
    assert!(!transport(&session, src).is_looping());

    let gain = session.add_node(NodeSpec::Gain);
    assert!(matches!(
        session.play(gain, false),
        Err(EditorError::WrongKind { .. })
    ));
}

#[test]
fn deleting_a_playing_source_releases_its_object() {
    let (mut session, src) = session_with_source(10.0);
    let sink = session.sink();
    session.connect(PinRef::node(src), PinRef::node(sink)).unwrap();
    session.play(src, false).unwrap();
    let object = transport(&session, src).playback().unwrap();
    session.delete_node(src).unwrap();
    assert!(session.engine().object(object).is_none());
    assert!(session.engine().attachments().is_empty());
    assert!(session.poll_engine().is_empty());
}
