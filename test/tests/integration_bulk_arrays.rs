/// Bulk vertex buffers cross the wire as flat typed sections, and partial
/// edits ship only the buffers that actually changed.
use meld_shared::LiveValue;
use meld_test::{mesh, vertex, SyncPair};

fn remote_mesh(pair: &SyncPair) -> &meld_shared::LiveDatablock {
    &pair.registry_b.collection("meshes").unwrap()[0]
}

fn local_mesh_mut(pair: &mut SyncPair) -> &mut meld_shared::LiveDatablock {
    let uuid = pair.registry_a.collection("meshes").unwrap()[0]
        .uuid
        .unwrap();
    pair.registry_a.find_mut(uuid).unwrap()
}

fn build_pair() -> SyncPair {
    let mut pair = SyncPair::new();
    pair.registry_a.insert(
        "meshes",
        mesh(
            "grid",
            vec![
                vertex(0.0, 0.0, 0.0, 0),
                vertex(1.0, 0.0, 0.0, 0),
                vertex(0.0, 1.0, 0.0, 1),
            ],
        ),
    );
    pair
}

#[test]
fn vertex_buffers_survive_the_wire() {
    let mut pair = build_pair();
    pair.sync_a_to_b();

    let local = &pair.registry_a.collection("meshes").unwrap()[0];
    let remote = remote_mesh(&pair);
    assert_eq!(remote.name, "grid");
    assert_eq!(remote.root.field("vertices"), local.root.field("vertices"));
    assert_eq!(
        remote.root.field("element_kind"),
        Some(&LiveValue::Str("tri".into()))
    );
}

#[test]
fn partial_edit_ships_less_than_a_full_create() {
    let mut pair = build_pair();
    pair.session_a.tick(&mut pair.registry_a).unwrap();
    let create_bytes = pair.wire.pending_toward_b();
    pair.session_b.tick(&mut pair.registry_b).unwrap();

    // nudge one coordinate; only the co buffer should travel
    let live = local_mesh_mut(&mut pair);
    let vertices = live
        .root
        .field_mut("vertices")
        .unwrap()
        .as_collection_mut()
        .unwrap();
    let first = vertices.get_index_mut(0).unwrap().as_struct_mut().unwrap();
    first.set_field("co", LiveValue::Vector(vec![5.0, 0.0, 0.0]));

    pair.session_a.tick(&mut pair.registry_a).unwrap();
    let update_bytes = pair.wire.pending_toward_b();
    assert!(update_bytes > 0);
    assert!(update_bytes < create_bytes);

    pair.session_b.tick(&mut pair.registry_b).unwrap();
    let remote = remote_mesh(&pair);
    let vertices = remote
        .root
        .field("vertices")
        .unwrap()
        .as_collection()
        .unwrap();
    let first = vertices.get_index(0).unwrap().as_struct().unwrap();
    assert_eq!(
        first.field("co"),
        Some(&LiveValue::Vector(vec![5.0, 0.0, 0.0]))
    );
    // the untouched per-index dictionary kept its values
    assert_eq!(first.field("select"), Some(&LiveValue::Int(0)));
}

#[test]
fn select_flags_travel_as_per_index_values() {
    let mut pair = build_pair();
    pair.sync_a_to_b();

    let live = local_mesh_mut(&mut pair);
    let vertices = live
        .root
        .field_mut("vertices")
        .unwrap()
        .as_collection_mut()
        .unwrap();
    let second = vertices.get_index_mut(1).unwrap().as_struct_mut().unwrap();
    second.set_field("select", LiveValue::Int(1));

    pair.sync_a_to_b();
    let remote = remote_mesh(&pair);
    let vertices = remote
        .root
        .field("vertices")
        .unwrap()
        .as_collection()
        .unwrap();
    let second = vertices.get_index(1).unwrap().as_struct().unwrap();
    assert_eq!(second.field("select"), Some(&LiveValue::Int(1)));
}

#[test]
fn length_change_ships_the_whole_group() {
    let mut pair = build_pair();
    pair.sync_a_to_b();

    let live = local_mesh_mut(&mut pair);
    let vertices = live
        .root
        .field_mut("vertices")
        .unwrap()
        .as_collection_mut()
        .unwrap();
    vertices.push(LiveValue::Struct(vertex(2.0, 2.0, 2.0, 1)));

    pair.sync_a_to_b();
    let local = &pair.registry_a.collection("meshes").unwrap()[0];
    let remote = remote_mesh(&pair);
    assert_eq!(remote.root.field("vertices"), local.root.field("vertices"));
    let vertices = remote
        .root
        .field("vertices")
        .unwrap()
        .as_collection()
        .unwrap();
    assert_eq!(vertices.len(), 4);
}
