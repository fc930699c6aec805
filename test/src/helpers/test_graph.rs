//! Builders for small live graphs used across the integration tests.

use meld_shared::{
    EntityUuid, LiveCollection, LiveDatablock, LiveStruct, LiveValue, ResizePolicy,
};

/// A plain object: a couple of scalars and a nested transform struct
pub fn object(name: &str) -> LiveDatablock {
    let transform = LiveStruct::new("Transform")
        .with_field("location", LiveValue::Vector(vec![0.0, 0.0, 0.0]))
        .with_field("scale", LiveValue::Vector(vec![1.0, 1.0, 1.0]));
    let root = LiveStruct::new("Object")
        .with_field("visible", LiveValue::Bool(true))
        .with_field("pass_index", LiveValue::Int(0))
        .with_field("transform", LiveValue::Struct(transform))
        .with_field("parent", LiveValue::Reference(None))
        .with_field("runtime_cache", LiveValue::Int(99));
    LiveDatablock::new(name, root).with_uuid(EntityUuid::generate())
}

/// Same object shape, pointing its `parent` slot at another entity
pub fn object_with_parent(name: &str, parent: EntityUuid) -> LiveDatablock {
    let mut datablock = object(name);
    datablock
        .root
        .set_field("parent", LiveValue::Reference(Some(parent)));
    datablock
}

pub fn vertex(x: f32, y: f32, z: f32, select: i64) -> LiveStruct {
    LiveStruct::new("Vertex")
        .with_field("co", LiveValue::Vector(vec![x, y, z]))
        .with_field("select", LiveValue::Int(select))
}

/// A mesh whose `vertices` field is bulk-transposed by the test protocol
pub fn mesh(name: &str, vertices: Vec<LiveStruct>) -> LiveDatablock {
    let mut collection = LiveCollection::seq(ResizePolicy::Resizable).with_element_type("Vertex");
    for vertex in vertices {
        collection.push(LiveValue::Struct(vertex));
    }
    let root = LiveStruct::new("Mesh")
        .with_field("element_kind", LiveValue::Str("tri".into()))
        .with_field("vertices", LiveValue::Collection(collection));
    LiveDatablock::new(name, root).with_uuid(EntityUuid::generate())
}
