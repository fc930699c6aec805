/// Cross-entity references settle in two phases: slots whose target is
/// already known are patched immediately, the rest park until the target
/// arrives.
use meld_shared::{EntityUuid, LiveValue};
use meld_test::{object, object_with_parent, SyncPair};

use meld_client::SessionEvent;

fn parent_slot(pair: &SyncPair, name: &str) -> LiveValue {
    pair.registry_b
        .collection("objects")
        .unwrap()
        .iter()
        .find(|db| db.name == name)
        .unwrap()
        .root
        .field("parent")
        .unwrap()
        .clone()
}

#[test]
fn reference_to_known_entity_settles_on_arrival() {
    let mut pair = SyncPair::new();
    let parent = object("parent");
    let parent_uuid = parent.uuid.unwrap();
    pair.registry_a.insert("objects", parent);
    pair.registry_a
        .insert("objects", object_with_parent("child", parent_uuid));

    pair.sync_a_to_b();
    assert_eq!(
        parent_slot(&pair, "child"),
        LiveValue::Reference(Some(parent_uuid))
    );
}

#[test]
fn same_tick_creates_settle_regardless_of_insertion_order() {
    let mut pair = SyncPair::new();
    let parent = object("parent");
    let parent_uuid = parent.uuid.unwrap();
    // the referer lands in the registry before its target
    pair.registry_a
        .insert("objects", object_with_parent("child", parent_uuid));
    pair.registry_a.insert("objects", parent);

    pair.sync_a_to_b();
    assert_eq!(
        parent_slot(&pair, "child"),
        LiveValue::Reference(Some(parent_uuid))
    );
    pair.session_b.tick(&mut pair.registry_b).unwrap();
    assert_eq!(pair.wire.pending_toward_a(), 0);
}

#[test]
fn reference_to_missing_entity_parks_then_resolves() {
    let mut pair = SyncPair::new();
    let parent_uuid = EntityUuid::generate();
    pair.registry_a
        .insert("objects", object_with_parent("child", parent_uuid));

    pair.sync_a_to_b();
    // target unknown on the receiving side, the slot stays hollow
    assert_eq!(parent_slot(&pair, "child"), LiveValue::Reference(None));

    // a parked slot must not leak back out as a reference-clearing update
    pair.session_b.tick(&mut pair.registry_b).unwrap();
    assert_eq!(pair.wire.pending_toward_a(), 0);

    let mut parent = object("parent");
    parent.uuid = Some(parent_uuid);
    pair.registry_a.insert("objects", parent);
    let events = pair.sync_a_to_b();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::EntityCreated { .. })));

    assert_eq!(
        parent_slot(&pair, "child"),
        LiveValue::Reference(Some(parent_uuid))
    );

    // once settled the child diffs clean again
    pair.session_b.tick(&mut pair.registry_b).unwrap();
    assert_eq!(pair.wire.pending_toward_a(), 0);
}
