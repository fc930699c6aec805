/// Wire robustness: bursts split across reads reassemble, payload garbage
/// fails one entity while the connection survives, framing garbage kills
/// the connection.
use meld_client::{ClientError, ConnectionStatus, SessionEvent, SyncSession};
use meld_shared::{Command, GraphRegistry, LiveValue, MessageType};
use meld_test::{mesh, object, protocol, vertex, LocalWire, SyncPair};

fn init_logs() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

#[test]
fn large_bursts_reassemble_across_split_reads() {
    // ~48 KiB of vertex data, well past one 16 KiB read chunk
    let vertices: Vec<_> = (0..4096)
        .map(|i| vertex(i as f32, 0.0, -(i as f32), (i % 2) as i64))
        .collect();
    let mut pair = SyncPair::new();
    pair.registry_a.insert("meshes", mesh("dense", vertices));

    pair.sync_a_to_b();
    let remote = &pair.registry_b.collection("meshes").unwrap()[0];
    let count = remote
        .root
        .field("vertices")
        .unwrap()
        .as_collection()
        .unwrap()
        .len();
    assert_eq!(count, 4096);
    assert_eq!(
        remote.root.field("vertices"),
        pair.registry_a.collection("meshes").unwrap()[0]
            .root
            .field("vertices")
    );
}

#[test]
fn garbage_payload_fails_one_entity_not_the_connection() {
    init_logs();
    let mut pair = SyncPair::new();
    pair.wire.inject_toward_b(
        &Command::new(900, MessageType::EntityUpdate, b"not an update".to_vec()).to_frame(),
    );

    let events = pair.session_b.tick(&mut pair.registry_b).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityFailed { .. })));
    assert_eq!(pair.session_b.status(), ConnectionStatus::Joined);

    // the connection still works afterwards
    pair.registry_a.insert("objects", object("survivor"));
    let events = pair.sync_a_to_b();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityCreated { .. })));
}

#[test]
fn framing_garbage_tears_the_connection_down() {
    let mut pair = SyncPair::new();
    pair.session_b.tick(&mut pair.registry_b).unwrap();

    // an impossible payload length in the frame header
    pair.wire.inject_toward_b(&[0xFF; 64]);
    let err = pair.session_b.tick(&mut pair.registry_b).unwrap_err();
    assert!(matches!(err, ClientError::ConnectionLost { .. }));
    assert_eq!(pair.session_b.status(), ConnectionStatus::Disconnected);

    // the status change surfaces on the next tick
    let events = pair.session_b.tick(&mut pair.registry_b).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::StatusChanged {
            status: ConnectionStatus::Disconnected
        }
    )));
}

#[test]
fn severed_wire_disconnects() {
    let mut pair = SyncPair::new();
    pair.session_a.tick(&mut pair.registry_a).unwrap();

    pair.wire.sever();
    let err = pair.session_a.tick(&mut pair.registry_a).unwrap_err();
    assert!(matches!(err, ClientError::ConnectionLost { .. }));
    assert_eq!(pair.session_a.status(), ConnectionStatus::Disconnected);
}

#[test]
fn own_echo_is_skipped() {
    init_logs();
    let mut session = SyncSession::new(protocol());
    session.connect(LocalWire::loopback()).unwrap();
    session.join_room("solo").unwrap();

    let mut registry = GraphRegistry::new();
    registry.insert("objects", object("cube"));
    session.tick(&mut registry).unwrap();

    // the relay bounced our create straight back; it must not re-apply
    let events = session.tick(&mut registry).unwrap();
    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityFailed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityCreated { .. })));
    assert_eq!(registry.collection("objects").unwrap().len(), 1);
    assert_eq!(
        registry.collection("objects").unwrap()[0]
            .root
            .field("visible"),
        Some(&LiveValue::Bool(true))
    );
}

#[test]
fn peer_commands_with_colliding_ids_still_apply() {
    init_logs();
    let mut pair = SyncPair::new();
    // both peers number their commands from one; ids never identify the
    // sender
    pair.registry_b.insert("objects", object("ball"));
    pair.sync_b_to_a();

    pair.registry_a.insert("objects", object("cube"));
    let events = pair.sync_a_to_b();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityCreated { .. })));
    let names: Vec<_> = pair
        .registry_b
        .collection("objects")
        .unwrap()
        .iter()
        .map(|db| db.name.as_str())
        .collect();
    assert!(names.contains(&"ball"));
    assert!(names.contains(&"cube"));
}
