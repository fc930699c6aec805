//! Wire payload codecs.
//!
//! Structured payloads travel as a JSON-encoded tree followed by a binary
//! section carrying the bulk buffers. The buffers are skipped by the JSON
//! serializer and written after it, keyed by the owning group's path and
//! field name, then grafted back into the decoded tree on the other side.
//! Everything else is plain reader/writer primitives.

use std::collections::HashMap;

use log::warn;

use meld_codec::{ByteReader, ByteWriter, Decode, Encode, MessageType};

use crate::{
    diff::RenameEvent,
    error::SyncError,
    graph::{PathStep, VisitPath},
    proxy::{CollectionItems, CollectionKey, DatablockProxy, Delta, DeltaValue, Proxy, StructDelta, StructProxy},
    soa::SoaElement,
    types::EntityUuid,
};

use serde::{Deserialize, Serialize};

/// Full snapshot of a new entity, with its destination collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePayload {
    pub collection: String,
    pub datablock: DatablockProxy,
}

/// Hollow delta against an entity both sides already hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub uuid: EntityUuid,
    pub delta: StructDelta,
}

pub fn encode_create(payload: &CreatePayload) -> Result<Vec<u8>, SyncError> {
    let json = serde_json::to_string(payload)?;
    let mut writer = ByteWriter::new();
    writer.write_string(&json);

    let mut buffers = Vec::new();
    let mut path = VisitPath::root();
    collect_struct(&payload.datablock.root, &mut path, &mut buffers);
    write_sections(&mut writer, &buffers);
    Ok(writer.into_bytes())
}

pub fn decode_create(bytes: &[u8]) -> Result<CreatePayload, SyncError> {
    let mut reader = ByteReader::new(bytes);
    let json = reader.read_string().map_err(SyncError::Decode)?;
    let mut payload: CreatePayload = serde_json::from_str(&json)?;

    let mut sections = read_sections(&mut reader)?;
    let mut slots = Vec::new();
    let mut path = VisitPath::root();
    collect_struct_mut(&mut payload.datablock.root, &mut path, &mut slots);
    graft(&mut sections, slots)?;
    Ok(payload)
}

pub fn encode_update(payload: &UpdatePayload) -> Result<Vec<u8>, SyncError> {
    let json = serde_json::to_string(payload)?;
    let mut writer = ByteWriter::new();
    writer.write_string(&json);

    let mut buffers = Vec::new();
    let mut path = VisitPath::root();
    collect_struct_delta(&payload.delta, &mut path, &mut buffers);
    write_sections(&mut writer, &buffers);
    Ok(writer.into_bytes())
}

pub fn decode_update(bytes: &[u8]) -> Result<UpdatePayload, SyncError> {
    let mut reader = ByteReader::new(bytes);
    let json = reader.read_string().map_err(SyncError::Decode)?;
    let mut payload: UpdatePayload = serde_json::from_str(&json)?;

    let mut sections = read_sections(&mut reader)?;
    let mut slots = Vec::new();
    let mut path = VisitPath::root();
    collect_struct_delta_mut(&mut payload.delta, &mut path, &mut slots);
    graft(&mut sections, slots)?;
    Ok(payload)
}

/// Removal carries a display name alongside the uuid so log lines on the
/// receiving side stay readable after the entity is gone
pub fn encode_remove(uuid: EntityUuid, display_name: &str) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_string(&uuid.to_string());
    writer.write_string(display_name);
    writer.into_bytes()
}

pub fn decode_remove(bytes: &[u8]) -> Result<(EntityUuid, String), SyncError> {
    let mut reader = ByteReader::new(bytes);
    let uuid = read_uuid(&mut reader)?;
    let display_name = reader.read_string().map_err(SyncError::Decode)?;
    Ok((uuid, display_name))
}

/// Renames travel batched, as flattened (uuid, old, new) triples
pub fn encode_rename(renames: &[RenameEvent]) -> Vec<u8> {
    let triples: Vec<(String, &str, &str)> = renames
        .iter()
        .map(|r| (r.uuid.to_string(), r.old_name.as_str(), r.new_name.as_str()))
        .collect();
    let mut writer = ByteWriter::new();
    triples.encode(&mut writer);
    writer.into_bytes()
}

pub fn decode_rename(bytes: &[u8]) -> Result<Vec<RenameEvent>, SyncError> {
    let mut reader = ByteReader::new(bytes);
    let triples =
        Vec::<(String, String, String)>::decode(&mut reader).map_err(SyncError::Decode)?;
    triples
        .into_iter()
        .map(|(uuid, old_name, new_name)| {
            let uuid = uuid
                .parse()
                .map_err(|_| SyncError::MalformedUuid { text: uuid.clone() })?;
            Ok(RenameEvent {
                uuid,
                old_name,
                new_name,
            })
        })
        .collect()
}

/// External media rides whole: identifying path plus raw content
pub fn encode_media(path: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(content.len() + path.len() + 8);
    writer.write_string(path);
    writer.write_blob(content);
    writer.into_bytes()
}

pub fn decode_media(bytes: &[u8]) -> Result<(String, Vec<u8>), SyncError> {
    let mut reader = ByteReader::new(bytes);
    let path = reader.read_string().map_err(SyncError::Decode)?;
    let content = reader.read_blob().map_err(SyncError::Decode)?;
    Ok((path, content))
}

/// Presence attributes are a free-form JSON dictionary
pub fn encode_attributes(
    attributes: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<u8>, SyncError> {
    let json = serde_json::to_string(attributes)?;
    let mut writer = ByteWriter::new();
    writer.write_string(&json);
    Ok(writer.into_bytes())
}

pub fn decode_attributes(
    bytes: &[u8],
) -> Result<serde_json::Map<String, serde_json::Value>, SyncError> {
    let mut reader = ByteReader::new(bytes);
    let json = reader.read_string().map_err(SyncError::Decode)?;
    Ok(serde_json::from_str(&json)?)
}

/// Tag an outgoing command with its sender so peers can drop relay echoes
pub fn encode_wrapped(client_id: &str, message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(client_id.len() + payload.len() + 10);
    writer.write_string(client_id);
    writer.write_u16(message_type as u16);
    writer.write_blob(payload);
    writer.into_bytes()
}

/// Unwrap a sender-tagged command: (client id, inner type, inner payload).
/// An unknown inner type is a payload error, not framing corruption.
pub fn decode_wrapped(bytes: &[u8]) -> Result<(String, MessageType, Vec<u8>), SyncError> {
    let mut reader = ByteReader::new(bytes);
    let client_id = reader.read_string().map_err(SyncError::Decode)?;
    let tag = reader.read_u16().map_err(SyncError::Decode)?;
    let message_type = MessageType::from_u16(tag).map_err(SyncError::Decode)?;
    let payload = reader.read_blob().map_err(SyncError::Decode)?;
    Ok((client_id, message_type, payload))
}

fn read_uuid(reader: &mut ByteReader) -> Result<EntityUuid, SyncError> {
    let text = reader.read_string().map_err(SyncError::Decode)?;
    text.parse()
        .map_err(|_| SyncError::MalformedUuid { text })
}

// -- bulk buffer sections -------------------------------------------------

type BufferRef<'a> = (String, String, &'a SoaElement);
type SlotRef<'a> = (String, String, &'a mut SoaElement);

fn write_sections(writer: &mut ByteWriter, buffers: &[BufferRef]) {
    writer.write_u32(buffers.len() as u32);
    for (path, field, element) in buffers {
        writer.write_string(path);
        writer.write_string(field);
        writer.write_blob(&element.data);
    }
}

fn read_sections(
    reader: &mut ByteReader,
) -> Result<HashMap<(String, String), Vec<u8>>, SyncError> {
    let count = reader.read_u32().map_err(SyncError::Decode)?;
    let mut sections = HashMap::with_capacity(count as usize);
    for _ in 0..count {
        let path = reader.read_string().map_err(SyncError::Decode)?;
        let field = reader.read_string().map_err(SyncError::Decode)?;
        let data = reader.read_blob().map_err(SyncError::Decode)?;
        sections.insert((path, field), data);
    }
    Ok(sections)
}

fn graft(
    sections: &mut HashMap<(String, String), Vec<u8>>,
    slots: Vec<SlotRef>,
) -> Result<(), SyncError> {
    for (path, field, element) in slots {
        let Some(data) = sections.remove(&(path.clone(), field.clone())) else {
            warn!("bulk buffer missing for {field:?} at {path}");
            continue;
        };
        let expected = element.count * element.components * element.code.width();
        if data.len() != expected {
            return Err(SyncError::StructuralMismatch {
                path,
                reason: format!(
                    "bulk buffer for {field:?} carries {} bytes, expected {expected}",
                    data.len()
                ),
            });
        }
        element.data = data;
    }
    for (path, field) in sections.keys() {
        warn!("bulk buffer for {field:?} at {path} has no slot, dropped");
    }
    Ok(())
}

fn collect_proxy<'a>(proxy: &'a Proxy, path: &mut VisitPath, out: &mut Vec<BufferRef<'a>>) {
    match proxy {
        Proxy::Scalar(_) | Proxy::Reference(_) => {}
        Proxy::ArrayGroup(group) => {
            let at = path.to_json();
            for (field, element) in &group.soa {
                out.push((at.clone(), field.clone(), element));
            }
        }
        Proxy::Struct(snapshot) => collect_struct(snapshot, path, out),
        Proxy::Collection(snapshot) => match &snapshot.items {
            CollectionItems::Seq(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(PathStep::Index(index));
                    collect_proxy(item, path, out);
                    path.pop();
                }
            }
            CollectionItems::Map(items) => {
                for (key, item) in items {
                    path.push(PathStep::name(key.clone()));
                    collect_proxy(item, path, out);
                    path.pop();
                }
            }
        },
    }
}

fn collect_struct<'a>(snapshot: &'a StructProxy, path: &mut VisitPath, out: &mut Vec<BufferRef<'a>>) {
    for (name, field) in &snapshot.fields {
        path.push(PathStep::name(name.clone()));
        collect_proxy(field, path, out);
        path.pop();
    }
}

fn collect_delta<'a>(delta: &'a Delta, path: &mut VisitPath, out: &mut Vec<BufferRef<'a>>) {
    match delta {
        Delta::Addition(proxy) | Delta::Deletion(proxy) | Delta::Replace(proxy) => {
            collect_proxy(proxy, path, out)
        }
        Delta::Update(value) => match value {
            DeltaValue::Scalar(_) => {}
            DeltaValue::ArrayGroup(group) => {
                let at = path.to_json();
                for (field, element) in &group.soa {
                    out.push((at.clone(), field.clone(), element));
                }
            }
            DeltaValue::Struct(delta) => collect_struct_delta(delta, path, out),
            DeltaValue::Collection(delta) => {
                for (key, entry) in &delta.entries {
                    path.push(key_step(key));
                    collect_delta(entry, path, out);
                    path.pop();
                }
            }
        },
    }
}

fn collect_struct_delta<'a>(
    delta: &'a StructDelta,
    path: &mut VisitPath,
    out: &mut Vec<BufferRef<'a>>,
) {
    for (name, entry) in &delta.fields {
        path.push(PathStep::name(name.clone()));
        collect_delta(entry, path, out);
        path.pop();
    }
}

fn collect_proxy_mut<'a>(proxy: &'a mut Proxy, path: &mut VisitPath, out: &mut Vec<SlotRef<'a>>) {
    match proxy {
        Proxy::Scalar(_) | Proxy::Reference(_) => {}
        Proxy::ArrayGroup(group) => {
            let at = path.to_json();
            for (field, element) in &mut group.soa {
                out.push((at.clone(), field.clone(), element));
            }
        }
        Proxy::Struct(snapshot) => collect_struct_mut(snapshot, path, out),
        Proxy::Collection(snapshot) => match &mut snapshot.items {
            CollectionItems::Seq(items) => {
                for (index, item) in items.iter_mut().enumerate() {
                    path.push(PathStep::Index(index));
                    collect_proxy_mut(item, path, out);
                    path.pop();
                }
            }
            CollectionItems::Map(items) => {
                for (key, item) in items {
                    path.push(PathStep::name(key.clone()));
                    collect_proxy_mut(item, path, out);
                    path.pop();
                }
            }
        },
    }
}

fn collect_struct_mut<'a>(
    snapshot: &'a mut StructProxy,
    path: &mut VisitPath,
    out: &mut Vec<SlotRef<'a>>,
) {
    for (name, field) in &mut snapshot.fields {
        path.push(PathStep::name(name.clone()));
        collect_proxy_mut(field, path, out);
        path.pop();
    }
}

fn collect_delta_mut<'a>(delta: &'a mut Delta, path: &mut VisitPath, out: &mut Vec<SlotRef<'a>>) {
    match delta {
        Delta::Addition(proxy) | Delta::Deletion(proxy) | Delta::Replace(proxy) => {
            collect_proxy_mut(proxy, path, out)
        }
        Delta::Update(value) => match value {
            DeltaValue::Scalar(_) => {}
            DeltaValue::ArrayGroup(group) => {
                let at = path.to_json();
                for (field, element) in &mut group.soa {
                    out.push((at.clone(), field.clone(), element));
                }
            }
            DeltaValue::Struct(delta) => collect_struct_delta_mut(delta, path, out),
            DeltaValue::Collection(delta) => {
                for (key, entry) in &mut delta.entries {
                    path.push(key_step(key));
                    collect_delta_mut(entry, path, out);
                    path.pop();
                }
            }
        },
    }
}

fn collect_struct_delta_mut<'a>(
    delta: &'a mut StructDelta,
    path: &mut VisitPath,
    out: &mut Vec<SlotRef<'a>>,
) {
    for (name, entry) in &mut delta.fields {
        path.push(PathStep::name(name.clone()));
        collect_delta_mut(entry, path, out);
        path.pop();
    }
}

fn key_step(key: &CollectionKey) -> PathStep {
    match key {
        CollectionKey::Index(index) => PathStep::Index(*index),
        CollectionKey::Key(key) => PathStep::name(key.clone()),
    }
}
