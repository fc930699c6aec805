use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    filter::FieldKind,
    graph::{LiveStruct, PathStep, VisitPath},
    proxy::{Delta, DeltaValue, Proxy, ProxyContext, SaveContext, StructDelta},
    soa::ArrayGroupProxy,
};

/// Snapshot of a struct node: type name plus the visited fields.
///
/// Which fields are visited, and which of them transpose into bulk
/// groups, comes from the schema filter; a field the filter denies never
/// enters the snapshot and so never produces deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructProxy {
    pub type_name: String,
    pub fields: BTreeMap<String, Proxy>,
}

impl StructProxy {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn load(
        live: &LiveStruct,
        ctx: &ProxyContext,
        path: &mut VisitPath,
    ) -> Result<Self, SyncError> {
        let mut fields = BTreeMap::new();
        for descriptor in ctx.filter.visit_order(live) {
            let Some(value) = live.field(&descriptor.name) else {
                continue;
            };
            path.push(PathStep::name(descriptor.name.clone()));
            let proxy = match &descriptor.kind {
                FieldKind::Value => Proxy::load(value, ctx, path)?,
                FieldKind::BulkArray(spec) => {
                    let collection =
                        value
                            .as_collection()
                            .ok_or_else(|| SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "bulk field is not a collection".to_string(),
                            })?;
                    Proxy::ArrayGroup(ArrayGroupProxy::load(collection, spec, path)?)
                }
            };
            path.pop();
            fields.insert(descriptor.name, proxy);
        }
        Ok(Self {
            type_name: live.type_name().to_string(),
            fields,
        })
    }

    /// Hollow field-level delta, or `None` when no visited field changed
    pub fn diff(
        &self,
        live: &LiveStruct,
        ctx: &ProxyContext,
        path: &mut VisitPath,
    ) -> Result<Option<StructDelta>, SyncError> {
        let mut fields = BTreeMap::new();
        for descriptor in ctx.filter.visit_order(live) {
            let Some(value) = live.field(&descriptor.name) else {
                continue;
            };
            path.push(PathStep::name(descriptor.name.clone()));
            let entry = match (&descriptor.kind, self.fields.get(&descriptor.name)) {
                (FieldKind::Value, Some(snapshot)) => snapshot.diff(value, ctx, path)?,
                (FieldKind::Value, None) => Some(Delta::Addition(Proxy::load(value, ctx, path)?)),
                (FieldKind::BulkArray(spec), snapshot) => {
                    let collection =
                        value
                            .as_collection()
                            .ok_or_else(|| SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "bulk field is not a collection".to_string(),
                            })?;
                    let current = ArrayGroupProxy::load(collection, spec, path)?;
                    match snapshot {
                        Some(Proxy::ArrayGroup(group)) => group
                            .diff(&current)
                            .map(|update| Delta::Update(DeltaValue::ArrayGroup(update))),
                        _ => Some(Delta::Addition(Proxy::ArrayGroup(current))),
                    }
                }
            };
            path.pop();
            if let Some(entry) = entry {
                fields.insert(descriptor.name, entry);
            }
        }

        // fields we once snapshotted that no longer exist live
        for (name, snapshot) in &self.fields {
            if live.field(name).is_none() {
                fields.insert(name.clone(), Delta::Deletion(snapshot.clone()));
            }
        }

        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(StructDelta { fields }))
        }
    }

    pub fn merge(&mut self, delta: &StructDelta) {
        for (name, entry) in &delta.fields {
            match entry {
                Delta::Deletion(_) => {
                    self.fields.remove(name);
                }
                Delta::Addition(proxy) | Delta::Replace(proxy) => {
                    self.fields.insert(name.clone(), proxy.clone());
                }
                Delta::Update(_) => {
                    if let Some(snapshot) = self.fields.get_mut(name) {
                        snapshot.merge(entry);
                    }
                }
            }
        }
    }

    /// Write an incoming field-level delta through to the live struct
    pub fn apply(
        &mut self,
        delta: &StructDelta,
        live: &mut LiveStruct,
        path: &mut VisitPath,
        save: &mut SaveContext,
    ) -> Result<(), SyncError> {
        for (name, entry) in &delta.fields {
            path.push(PathStep::name(name.clone()));
            match entry {
                Delta::Deletion(_) => {
                    self.fields.remove(name);
                    live.remove_field(name);
                }
                Delta::Addition(proxy) | Delta::Replace(proxy) => {
                    proxy.save(live.field_slot(name), path, save)?;
                    self.fields.insert(name.clone(), proxy.clone());
                }
                Delta::Update(_) => {
                    let snapshot =
                        self.fields
                            .get_mut(name)
                            .ok_or_else(|| SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "update for a field never snapshotted".to_string(),
                            })?;
                    snapshot.apply(entry, live.field_slot(name), path, save)?;
                }
            }
            path.pop();
        }
        Ok(())
    }

    /// Materialize a live struct carrying every snapshotted field
    pub fn save(&self, path: &mut VisitPath, save: &mut SaveContext) -> Result<LiveStruct, SyncError> {
        let mut live = LiveStruct::new(self.type_name.clone());
        for (name, proxy) in &self.fields {
            path.push(PathStep::name(name.clone()));
            proxy.save(live.field_slot(name), path, save)?;
            path.pop();
        }
        Ok(live)
    }
}
