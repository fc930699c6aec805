//! The proxy core.
//!
//! A proxy is the client's own snapshot of the last-synchronized state of
//! one subtree. Loading fills it from the live graph, diffing compares it
//! against the live graph to produce a hollow delta, applying writes an
//! incoming delta through to both the proxy and the live graph, and
//! saving materializes a full subtree from scratch.
//!
//! Cross-entity references are never chased during a write; the slot gets
//! a placeholder and the target uuid is recorded in the [`SaveContext`]
//! for settlement after the whole batch has landed.

mod collection;
mod context;
mod datablock;
mod delta;
mod reference;
mod struct_proxy;

pub use collection::{CollectionItems, CollectionProxy};
pub use context::{ProxyContext, RefCandidate, SaveContext};
pub use datablock::{DatablockProxies, DatablockProxy};
pub use delta::{CollectionDelta, CollectionKey, Delta, DeltaValue, ScalarValue, StructDelta};
pub use reference::ReferenceProxy;
pub use struct_proxy::StructProxy;

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    graph::{LiveValue, VisitPath},
    soa::ArrayGroupProxy,
    types::EntityUuid,
};

/// Snapshot of one live node, shaped like the node itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Proxy {
    Scalar(ScalarValue),
    Reference(ReferenceProxy),
    Struct(StructProxy),
    Collection(CollectionProxy),
    /// Bulk collection transposed into flat buffers; only ever created
    /// for fields the schema filter marks as bulk
    ArrayGroup(ArrayGroupProxy),
}

impl Proxy {
    /// Snapshot a live node. Bulk fields never reach this dispatcher;
    /// [`StructProxy::load`] intercepts them via the schema filter.
    pub fn load(
        live: &LiveValue,
        ctx: &ProxyContext,
        path: &mut VisitPath,
    ) -> Result<Proxy, SyncError> {
        Ok(match live {
            LiveValue::Reference(target) => Proxy::Reference(ReferenceProxy::new(*target)),
            LiveValue::Struct(live) => Proxy::Struct(StructProxy::load(live, ctx, path)?),
            LiveValue::Collection(live) => {
                Proxy::Collection(CollectionProxy::load(live, ctx, path)?)
            }
            leaf => match ScalarValue::from_live(leaf) {
                Some(value) => Proxy::Scalar(value),
                None => unreachable!("every leaf kind has a scalar snapshot"),
            },
        })
    }

    /// Hollow delta turning this snapshot into the live node, or `None`
    /// when nothing changed. A node that changed kind escalates to
    /// [`Delta::Replace`].
    pub fn diff(
        &self,
        live: &LiveValue,
        ctx: &ProxyContext,
        path: &mut VisitPath,
    ) -> Result<Option<Delta>, SyncError> {
        Ok(match (self, live) {
            (Proxy::Reference(snapshot), LiveValue::Reference(target)) => {
                // a link has nothing hollow about it; it ships whole
                if snapshot.target == *target {
                    None
                } else {
                    Some(Delta::Replace(Proxy::Reference(ReferenceProxy::new(
                        *target,
                    ))))
                }
            }
            (Proxy::Struct(snapshot), LiveValue::Struct(live)) => snapshot
                .diff(live, ctx, path)?
                .map(|delta| Delta::Update(DeltaValue::Struct(delta))),
            (Proxy::Collection(snapshot), LiveValue::Collection(live)) => {
                snapshot.diff(live, ctx, path)?
            }
            (Proxy::Scalar(snapshot), leaf) => match ScalarValue::from_live(leaf) {
                Some(value) if *snapshot == value => None,
                Some(value) => Some(Delta::Update(DeltaValue::Scalar(value))),
                None => Some(Delta::Replace(Proxy::load(leaf, ctx, path)?)),
            },
            (_, live) => Some(Delta::Replace(Proxy::load(live, ctx, path)?)),
        })
    }

    /// Fold an outgoing delta into this snapshot after it has been sent
    pub fn merge(&mut self, delta: &Delta) {
        match delta {
            Delta::Addition(proxy) | Delta::Replace(proxy) => *self = proxy.clone(),
            // entry deletions are folded by the containing node
            Delta::Deletion(_) => {}
            Delta::Update(value) => match (&mut *self, value) {
                (Proxy::Scalar(snapshot), DeltaValue::Scalar(value)) => *snapshot = value.clone(),
                (Proxy::Struct(snapshot), DeltaValue::Struct(delta)) => snapshot.merge(delta),
                (Proxy::Collection(snapshot), DeltaValue::Collection(delta)) => {
                    snapshot.merge(delta)
                }
                (Proxy::ArrayGroup(snapshot), DeltaValue::ArrayGroup(update)) => {
                    snapshot.merge(update)
                }
                _ => {}
            },
        }
    }

    /// Write an incoming delta through to both this snapshot and the live
    /// slot it mirrors
    pub fn apply(
        &mut self,
        delta: &Delta,
        slot: &mut LiveValue,
        path: &mut VisitPath,
        save: &mut SaveContext,
    ) -> Result<(), SyncError> {
        match delta {
            Delta::Addition(proxy) | Delta::Replace(proxy) => {
                proxy.save(slot, path, save)?;
                *self = proxy.clone();
                Ok(())
            }
            Delta::Deletion(_) => Err(SyncError::StructuralMismatch {
                path: path.to_string(),
                reason: "deletion outside a container".to_string(),
            }),
            Delta::Update(value) => match (&mut *self, value, &mut *slot) {
                (Proxy::Scalar(snapshot), DeltaValue::Scalar(value), slot) => {
                    *snapshot = value.clone();
                    *slot = value.to_live();
                    Ok(())
                }
                (Proxy::Struct(snapshot), DeltaValue::Struct(delta), LiveValue::Struct(live)) => {
                    snapshot.apply(delta, live, path, save)
                }
                (
                    Proxy::Collection(snapshot),
                    DeltaValue::Collection(delta),
                    LiveValue::Collection(live),
                ) => snapshot.apply(delta, live, path, save),
                (
                    Proxy::ArrayGroup(snapshot),
                    DeltaValue::ArrayGroup(update),
                    LiveValue::Collection(live),
                ) => {
                    snapshot.merge(update);
                    snapshot.write_back(live, path)
                }
                _ => Err(SyncError::StructuralMismatch {
                    path: path.to_string(),
                    reason: "update shape does not match the node".to_string(),
                }),
            },
        }
    }

    /// Materialize this snapshot into a live slot from scratch
    pub fn save(
        &self,
        slot: &mut LiveValue,
        path: &mut VisitPath,
        save: &mut SaveContext,
    ) -> Result<(), SyncError> {
        match self {
            Proxy::Scalar(value) => *slot = value.to_live(),
            Proxy::Reference(reference) => reference.save(slot, path, save),
            Proxy::Struct(snapshot) => *slot = LiveValue::Struct(snapshot.save(path, save)?),
            Proxy::Collection(snapshot) => {
                *slot = LiveValue::Collection(snapshot.save(path, save)?)
            }
            Proxy::ArrayGroup(group) => *slot = LiveValue::Collection(group.materialize(path)?),
        }
        Ok(())
    }

    pub(crate) fn referenced_uuids(&self, out: &mut Vec<EntityUuid>) {
        match self {
            Proxy::Scalar(_) | Proxy::ArrayGroup(_) => {}
            Proxy::Reference(reference) => {
                if let Some(target) = reference.target {
                    out.push(target);
                }
            }
            Proxy::Struct(snapshot) => {
                for field in snapshot.fields.values() {
                    field.referenced_uuids(out);
                }
            }
            Proxy::Collection(snapshot) => snapshot.referenced_uuids(out),
        }
    }
}
