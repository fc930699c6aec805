//! Declarative per-type visit configuration.
//!
//! The domain layer describes, per runtime type name, which fields the
//! proxy core visits and in what order, plus which collection-valued fields
//! are transposed into flat bulk buffers. Built once, cached by type name,
//! immutable after the owning [`crate::SyncProtocol`] locks.

use std::collections::{HashMap, HashSet};

use meld_codec::TypeCode;

use crate::graph::LiveStruct;

/// One per-element field transposed into a flat typed buffer
#[derive(Debug, Clone, PartialEq)]
pub struct SoaFieldSpec {
    pub name: String,
    pub code: TypeCode,
    /// Scalar components per element (3 for a vec3, 1 for a plain scalar)
    pub components: usize,
}

impl SoaFieldSpec {
    pub fn scalar(name: impl Into<String>, code: TypeCode) -> Self {
        Self {
            name: name.into(),
            code,
            components: 1,
        }
    }

    pub fn vector(name: impl Into<String>, code: TypeCode, components: usize) -> Self {
        Self {
            name: name.into(),
            code,
            components,
        }
    }
}

/// Bulk handling for one large homogeneous collection field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkSpec {
    pub soa_fields: Vec<SoaFieldSpec>,
    /// Fields not representable in a flat buffer, kept as per-index
    /// dictionaries instead
    pub aos_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Visited recursively as an ordinary value
    Value,
    /// Transposed into an array-group proxy
    BulkArray(BulkSpec),
}

/// One visit slot produced by resolving a [`TypeSpec`] against a live struct
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Declarative allow/deny lists and ordering hints for one runtime type
#[derive(Debug, Clone, Default)]
pub struct TypeSpec {
    type_name: String,
    /// If non-empty, only these fields are visited
    allow: Vec<String>,
    deny: HashSet<String>,
    /// Fields pulled to the front of the visit order. Container-defining
    /// fields go here so they are applied before contained collections.
    order_first: Vec<String>,
    bulk: HashMap<String, BulkSpec>,
}

impl TypeSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn allow(mut self, fields: &[&str]) -> Self {
        self.allow.extend(fields.iter().map(|s| s.to_string()));
        self
    }

    pub fn deny(mut self, fields: &[&str]) -> Self {
        self.deny.extend(fields.iter().map(|s| s.to_string()));
        self
    }

    pub fn order_first(mut self, fields: &[&str]) -> Self {
        self.order_first
            .extend(fields.iter().map(|s| s.to_string()));
        self
    }

    pub fn bulk_field(mut self, field: impl Into<String>, spec: BulkSpec) -> Self {
        self.bulk.insert(field.into(), spec);
        self
    }

    fn visible(&self, field: &str) -> bool {
        if self.deny.contains(field) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|f| f == field)
    }

    fn descriptor(&self, field: &str) -> FieldDescriptor {
        let kind = match self.bulk.get(field) {
            Some(spec) => FieldKind::BulkArray(spec.clone()),
            None => FieldKind::Value,
        };
        FieldDescriptor {
            name: field.to_string(),
            kind,
        }
    }

    /// Ordered visit list for one live struct of this type: ordering hints
    /// first, then the remaining visible fields in storage order
    fn resolve(&self, live: &LiveStruct) -> Vec<FieldDescriptor> {
        let mut out = Vec::new();
        for field in &self.order_first {
            if self.visible(field) && live.field(field).is_some() {
                out.push(self.descriptor(field));
            }
        }
        for field in live.field_names() {
            if self.order_first.iter().any(|f| f == field) {
                continue;
            }
            if self.visible(field) {
                out.push(self.descriptor(field));
            }
        }
        out
    }
}

/// Type name -> visit configuration, cached by type identity
#[derive(Debug, Clone, Default)]
pub struct SchemaFilter {
    specs: HashMap<String, TypeSpec>,
}

impl SchemaFilter {
    /// Visit order for a live struct. Types without a registered spec get
    /// every field in storage order.
    pub fn visit_order(&self, live: &LiveStruct) -> Vec<FieldDescriptor> {
        match self.specs.get(live.type_name()) {
            Some(spec) => spec.resolve(live),
            None => live
                .field_names()
                .map(|name| FieldDescriptor {
                    name: name.to_string(),
                    kind: FieldKind::Value,
                })
                .collect(),
        }
    }

    pub fn spec(&self, type_name: &str) -> Option<&TypeSpec> {
        self.specs.get(type_name)
    }
}

/// Builds a [`SchemaFilter`] once, before the session starts
#[derive(Debug, Default)]
pub struct FilterBuilder {
    specs: HashMap<String, TypeSpec>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, spec: TypeSpec) -> Self {
        self.specs.insert(spec.type_name().to_string(), spec);
        self
    }

    pub fn build(self) -> SchemaFilter {
        SchemaFilter { specs: self.specs }
    }
}
