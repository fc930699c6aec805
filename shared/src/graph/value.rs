use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::EntityUuid;

/// One node of the live application graph
#[derive(Debug, Clone, PartialEq)]
pub enum LiveValue {
    /// Explicit absence
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// vec2/3/4 and colors: consecutive f32 components
    Vector(Vec<f32>),
    /// Weak link to a top-level entity: identity only, never ownership
    Reference(Option<EntityUuid>),
    Struct(LiveStruct),
    Collection(LiveCollection),
}

impl LiveValue {
    pub fn as_struct(&self) -> Option<&LiveStruct> {
        match self {
            LiveValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut LiveStruct> {
        match self {
            LiveValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&LiveCollection> {
        match self {
            LiveValue::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut LiveCollection> {
        match self {
            LiveValue::Collection(c) => Some(c),
            _ => None,
        }
    }
}

/// A struct-like node: runtime type name + named fields.
///
/// Field order is deterministic (sorted); the schema filter decides the
/// visit order, not the storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStruct {
    type_name: String,
    fields: BTreeMap<String, LiveValue>,
}

impl LiveStruct {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: LiveValue) -> &mut Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Builder-style variant of [`LiveStruct::set_field`]
    pub fn with_field(mut self, name: impl Into<String>, value: LiveValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&LiveValue> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut LiveValue> {
        self.fields.get_mut(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<LiveValue> {
        self.fields.remove(name)
    }

    /// Insert-if-absent access used by write-through application
    pub fn field_slot(&mut self, name: &str) -> &mut LiveValue {
        self.fields
            .entry(name.to_string())
            .or_insert(LiveValue::None)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &LiveValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Structural capabilities of a collection's backing store.
///
/// Drives the safe-update-prefix policy: some backing collections cannot
/// remove/insert except at the tail, and some cannot resize at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizePolicy {
    /// Arbitrary insert/remove
    Resizable,
    /// Append/truncate at the tail only
    TailOnly,
    /// Length can never change in place; a length change forces a
    /// whole-subtree replace
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionStorage {
    /// Ordered sequence, positionally addressed
    Seq(Vec<LiveValue>),
    /// String-keyed map
    Map(BTreeMap<String, LiveValue>),
}

/// An ordered sequence or string-keyed map of child nodes
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCollection {
    pub resize: ResizePolicy,
    /// Type name used to materialize new elements when the collection grows
    pub element_type: Option<String>,
    pub storage: CollectionStorage,
}

impl LiveCollection {
    pub fn seq(resize: ResizePolicy) -> Self {
        Self {
            resize,
            element_type: None,
            storage: CollectionStorage::Seq(Vec::new()),
        }
    }

    pub fn map() -> Self {
        Self {
            resize: ResizePolicy::Resizable,
            element_type: None,
            storage: CollectionStorage::Map(BTreeMap::new()),
        }
    }

    pub fn with_element_type(mut self, type_name: impl Into<String>) -> Self {
        self.element_type = Some(type_name.into());
        self
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            CollectionStorage::Seq(items) => items.len(),
            CollectionStorage::Map(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, value: LiveValue) -> &mut Self {
        if let CollectionStorage::Seq(items) = &mut self.storage {
            items.push(value);
        }
        self
    }

    pub fn with_item(mut self, value: LiveValue) -> Self {
        self.push(value);
        self
    }

    pub fn insert_key(&mut self, key: impl Into<String>, value: LiveValue) -> &mut Self {
        if let CollectionStorage::Map(items) = &mut self.storage {
            items.insert(key.into(), value);
        }
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: LiveValue) -> Self {
        self.insert_key(key, value);
        self
    }

    pub fn get_index(&self, index: usize) -> Option<&LiveValue> {
        match &self.storage {
            CollectionStorage::Seq(items) => items.get(index),
            CollectionStorage::Map(_) => None,
        }
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut LiveValue> {
        match &mut self.storage {
            CollectionStorage::Seq(items) => items.get_mut(index),
            CollectionStorage::Map(_) => None,
        }
    }

    pub fn get_key(&self, key: &str) -> Option<&LiveValue> {
        match &self.storage {
            CollectionStorage::Map(items) => items.get(key),
            CollectionStorage::Seq(_) => None,
        }
    }

    pub fn get_key_mut(&mut self, key: &str) -> Option<&mut LiveValue> {
        match &mut self.storage {
            CollectionStorage::Map(items) => items.get_mut(key),
            CollectionStorage::Seq(_) => None,
        }
    }

    pub fn remove_key(&mut self, key: &str) -> Option<LiveValue> {
        match &mut self.storage {
            CollectionStorage::Map(items) => items.remove(key),
            CollectionStorage::Seq(_) => None,
        }
    }

    /// Fresh element for sequence growth, typed if the collection knows its
    /// element type
    pub fn new_element(&self) -> LiveValue {
        match &self.element_type {
            Some(type_name) => LiveValue::Struct(LiveStruct::new(type_name.clone())),
            None => LiveValue::None,
        }
    }
}
