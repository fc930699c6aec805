/// End-to-end entity lifecycle between two sessions over an in-memory wire:
/// creation, scalar updates, renames and removal.
use meld_shared::LiveValue;
use meld_test::{object, SyncPair};

use meld_client::SessionEvent;

fn object_uuid(pair: &SyncPair, name: &str) -> meld_shared::EntityUuid {
    pair.registry_a
        .collection("objects")
        .unwrap()
        .iter()
        .find(|db| db.name == name)
        .unwrap()
        .uuid
        .unwrap()
}

#[test]
fn create_propagates_and_denied_fields_stay_home() {
    let mut pair = SyncPair::new();
    pair.registry_a.insert("objects", object("cube"));

    let events = pair.sync_a_to_b();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityCreated { collection, .. } if collection == "objects")));

    let cubes = pair.registry_b.collection("objects").unwrap();
    assert_eq!(cubes.len(), 1);
    assert_eq!(cubes[0].name, "cube");
    assert_eq!(cubes[0].uuid.unwrap(), object_uuid(&pair, "cube"));
    assert_eq!(cubes[0].root.field("visible"), Some(&LiveValue::Bool(true)));
    // the protocol denies runtime_cache, so it never crossed the wire
    assert_eq!(cubes[0].root.field("runtime_cache"), None);
}

#[test]
fn scalar_update_propagates_and_converges() {
    let mut pair = SyncPair::new();
    pair.registry_a.insert("objects", object("cube"));
    pair.sync_a_to_b();
    let uuid = object_uuid(&pair, "cube");

    let live = pair.registry_a.find_mut(uuid).unwrap();
    live.root.set_field("visible", LiveValue::Bool(false));
    let transform = live
        .root
        .field_mut("transform")
        .unwrap()
        .as_struct_mut()
        .unwrap();
    transform.set_field("location", LiveValue::Vector(vec![1.0, 2.0, 3.0]));

    let events = pair.sync_a_to_b();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityUpdated { uuid: u } if *u == uuid)));

    let remote = &pair.registry_b.collection("objects").unwrap()[0];
    assert_eq!(remote.root.field("visible"), Some(&LiveValue::Bool(false)));
    let transform = remote.root.field("transform").unwrap().as_struct().unwrap();
    assert_eq!(
        transform.field("location"),
        Some(&LiveValue::Vector(vec![1.0, 2.0, 3.0]))
    );

    // both sides converged, the next tick has nothing to say
    pair.session_a.tick(&mut pair.registry_a).unwrap();
    assert_eq!(pair.wire.pending_toward_b(), 0);
}

#[test]
fn rename_preserves_identity() {
    let mut pair = SyncPair::new();
    pair.registry_a.insert("objects", object("cube"));
    pair.sync_a_to_b();
    let uuid = object_uuid(&pair, "cube");

    assert!(pair.registry_a.rename(uuid, "sphere"));
    let events = pair.sync_a_to_b();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::EntityRenamed { uuid: u, old_name, new_name }
            if *u == uuid && old_name == "cube" && new_name == "sphere"
    )));

    let remote = &pair.registry_b.collection("objects").unwrap()[0];
    assert_eq!(remote.name, "sphere");
    assert_eq!(remote.uuid, Some(uuid));
}

#[test]
fn removal_propagates_with_display_name() {
    let mut pair = SyncPair::new();
    pair.registry_a.insert("objects", object("cube"));
    pair.sync_a_to_b();
    let uuid = object_uuid(&pair, "cube");

    pair.registry_a.remove(uuid).unwrap();
    let events = pair.sync_a_to_b();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::EntityRemoved { uuid: u, display_name } if *u == uuid && display_name == "cube"
    )));
    assert!(pair.registry_b.collection("objects").unwrap().is_empty());

    // the sender's snapshot bookkeeping is gone too; later ticks stay quiet
    pair.session_a.tick(&mut pair.registry_a).unwrap();
    assert_eq!(pair.wire.pending_toward_b(), 0);
}

#[test]
fn quiet_graphs_send_nothing() {
    let mut pair = SyncPair::new();
    pair.registry_a.insert("objects", object("cube"));
    pair.sync_a_to_b();
    pair.sync_b_to_a();

    pair.session_a.tick(&mut pair.registry_a).unwrap();
    pair.session_b.tick(&mut pair.registry_b).unwrap();
    assert_eq!(pair.wire.pending_toward_b(), 0);
    assert_eq!(pair.wire.pending_toward_a(), 0);
}
