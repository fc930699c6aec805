use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{graph::LiveValue, proxy::Proxy, soa::ArrayGroupProxy, types::EntityUuid};

/// A leaf value as it rides inside proxies and deltas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vector(Vec<f32>),
}

impl ScalarValue {
    /// Snapshot a live leaf; structured nodes return `None`
    pub fn from_live(value: &LiveValue) -> Option<Self> {
        match value {
            LiveValue::None => Some(ScalarValue::None),
            LiveValue::Bool(v) => Some(ScalarValue::Bool(*v)),
            LiveValue::Int(v) => Some(ScalarValue::Int(*v)),
            LiveValue::Float(v) => Some(ScalarValue::Float(*v)),
            LiveValue::Str(v) => Some(ScalarValue::Str(v.clone())),
            LiveValue::Vector(v) => Some(ScalarValue::Vector(v.clone())),
            LiveValue::Reference(_) | LiveValue::Struct(_) | LiveValue::Collection(_) => None,
        }
    }

    pub fn to_live(&self) -> LiveValue {
        match self {
            ScalarValue::None => LiveValue::None,
            ScalarValue::Bool(v) => LiveValue::Bool(*v),
            ScalarValue::Int(v) => LiveValue::Int(*v),
            ScalarValue::Float(v) => LiveValue::Float(*v),
            ScalarValue::Str(v) => LiveValue::Str(v.clone()),
            ScalarValue::Vector(v) => LiveValue::Vector(v.clone()),
        }
    }
}

/// One node's worth of change.
///
/// `Update` is hollow: it carries only what changed beneath the node.
/// `Replace` escalates: the receiver discards the subtree and rebuilds it
/// from the carried full proxy. `Addition` and `Deletion` only ever appear
/// as entries of a containing struct or collection delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Delta {
    Update(DeltaValue),
    Addition(Proxy),
    Deletion(Proxy),
    Replace(Proxy),
}

/// The payload of a hollow update, shaped like the node it patches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeltaValue {
    Scalar(ScalarValue),
    Struct(StructDelta),
    Collection(CollectionDelta),
    /// Whole-buffer replacement for the changed fields of a bulk group
    ArrayGroup(ArrayGroupProxy),
}

/// Changed fields only; untouched fields never ride along
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructDelta {
    pub fields: BTreeMap<String, Delta>,
}

impl StructDelta {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Addresses one entry of a sequence or map collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionKey {
    Index(usize),
    Key(String),
}

/// Entry-level changes, in application order: prefix updates first, then
/// tail deletions from the back, then additions from the front
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionDelta {
    pub entries: Vec<(CollectionKey, Delta)>,
}

impl CollectionDelta {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Delta {
    /// Uuids of every entity the delta's reference slots point at, used to
    /// pre-register resolver interest
    pub fn referenced_uuids(&self, out: &mut Vec<EntityUuid>) {
        match self {
            Delta::Update(value) => value.referenced_uuids(out),
            Delta::Addition(proxy) | Delta::Deletion(proxy) | Delta::Replace(proxy) => {
                proxy.referenced_uuids(out)
            }
        }
    }
}

impl DeltaValue {
    fn referenced_uuids(&self, out: &mut Vec<EntityUuid>) {
        match self {
            DeltaValue::Scalar(_) | DeltaValue::ArrayGroup(_) => {}
            DeltaValue::Struct(delta) => {
                for entry in delta.fields.values() {
                    entry.referenced_uuids(out);
                }
            }
            DeltaValue::Collection(delta) => {
                for (_, entry) in &delta.entries {
                    entry.referenced_uuids(out);
                }
            }
        }
    }
}
