/// Presence dictionaries, media blobs, name conflicts and the optional
/// outgoing command delay.
use std::time::Duration;

use meld_client::{ClientError, SessionEvent, SyncSession};
use meld_shared::GraphRegistry;
use meld_test::{object, protocol, LocalWire, SyncPair};

use serde_json::json;

fn dict(pairs: &[(&str, serde_json::Value)]) -> meld_client::AttributeDict {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn client_attributes_ship_only_changed_keys() {
    let mut pair = SyncPair::new();
    pair.session_a
        .update_client_attributes(&dict(&[("user_name", json!("alice"))]))
        .unwrap();

    let events = pair.sync_a_to_b();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ClientAttributesChanged { changed } if changed["user_name"] == json!("alice")
    )));

    // sending the identical dictionary again queues nothing
    pair.session_a
        .update_client_attributes(&dict(&[("user_name", json!("alice"))]))
        .unwrap();
    pair.session_a.tick(&mut pair.registry_a).unwrap();
    assert_eq!(pair.wire.pending_toward_b(), 0);
}

#[test]
fn room_attributes_propagate() {
    let mut pair = SyncPair::new();
    pair.session_a
        .update_room_attributes(&dict(&[("experimental_sync", json!(true))]))
        .unwrap();

    let events = pair.sync_a_to_b();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::RoomAttributesChanged { changed } if changed["experimental_sync"] == json!(true)
    )));
    assert_eq!(
        pair.session_b.room_attributes()["experimental_sync"],
        json!(true)
    );
}

#[test]
fn media_rides_whole() {
    let mut pair = SyncPair::new();
    let bytes = vec![0u8, 159, 146, 150, 255];
    pair.session_a
        .send_media("textures/wood.png", &bytes)
        .unwrap();

    let events = pair.sync_a_to_b();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::MediaReceived { path, content }
            if path == "textures/wood.png" && *content == bytes
    )));
}

#[test]
fn incoming_name_conflict_is_suffixed() {
    let mut pair = SyncPair::new();
    // B already owns a "cube" of its own
    pair.registry_b.insert("objects", object("cube"));
    pair.session_b.tick(&mut pair.registry_b).unwrap();

    pair.registry_a.insert("objects", object("cube"));
    pair.session_a.tick(&mut pair.registry_a).unwrap();
    let events = pair.session_b.tick(&mut pair.registry_b).unwrap();

    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::EntityRenamed { old_name, new_name, .. }
            if old_name == "cube" && new_name == "cube.001"
    )));
    let names: Vec<_> = pair
        .registry_b
        .collection("objects")
        .unwrap()
        .iter()
        .map(|db| db.name.as_str())
        .collect();
    assert!(names.contains(&"cube"));
    assert!(names.contains(&"cube.001"));
}

#[test]
fn command_delay_holds_the_flush() {
    let wire = LocalWire::new();
    let mut config = protocol();
    config.command_delay(Duration::from_millis(40));
    let mut session = SyncSession::new(config);
    session.connect(wire.endpoint_a()).unwrap();
    session.join_room("latency-lab").unwrap();

    let mut registry = GraphRegistry::new();
    registry.insert("objects", object("cube"));
    session.tick(&mut registry).unwrap();
    assert_eq!(wire.pending_toward_b(), 0);

    std::thread::sleep(Duration::from_millis(60));
    session.tick(&mut registry).unwrap();
    assert!(wire.pending_toward_b() > 0);
}

#[test]
fn offline_sessions_reject_sends() {
    let mut session = SyncSession::new(protocol());
    assert!(matches!(
        session.send_media("any", b"bytes"),
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        session.join_room("nowhere"),
        Err(ClientError::NotConnected)
    ));

    session.connect(LocalWire::loopback()).unwrap();
    assert!(matches!(
        session.connect(LocalWire::loopback()),
        Err(ClientError::AlreadyConnected)
    ));
}
