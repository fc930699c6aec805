use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    graph::{CollectionStorage, LiveCollection, LiveValue, PathStep, ResizePolicy, VisitPath},
    proxy::{CollectionDelta, CollectionKey, Delta, DeltaValue, Proxy, ProxyContext, SaveContext},
    types::EntityUuid,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollectionItems {
    Seq(Vec<Proxy>),
    Map(BTreeMap<String, Proxy>),
}

/// Snapshot of a collection node.
///
/// Sequences diff positionally over the safe update prefix, the shared
/// leading range both sides have: entries past the live length are tail
/// deletions, entries past the snapshot length are tail additions. A
/// length change on a fixed-size collection cannot be expressed that way
/// and escalates to a whole-subtree replace. Maps diff by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionProxy {
    pub resize: ResizePolicy,
    pub element_type: Option<String>,
    pub items: CollectionItems,
}

impl CollectionProxy {
    pub fn load(
        live: &LiveCollection,
        ctx: &ProxyContext,
        path: &mut VisitPath,
    ) -> Result<Self, SyncError> {
        let items = match &live.storage {
            CollectionStorage::Seq(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    path.push(PathStep::Index(index));
                    out.push(Proxy::load(element, ctx, path)?);
                    path.pop();
                }
                CollectionItems::Seq(out)
            }
            CollectionStorage::Map(entries) => {
                let mut out = BTreeMap::new();
                for (key, element) in entries {
                    path.push(PathStep::name(key.clone()));
                    out.insert(key.clone(), Proxy::load(element, ctx, path)?);
                    path.pop();
                }
                CollectionItems::Map(out)
            }
        };
        Ok(Self {
            resize: live.resize,
            element_type: live.element_type.clone(),
            items,
        })
    }

    pub fn len(&self) -> usize {
        match &self.items {
            CollectionItems::Seq(items) => items.len(),
            CollectionItems::Map(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry-level delta against the live collection, already escalated
    /// to a replace where incremental reconciliation is impossible
    pub fn diff(
        &self,
        live: &LiveCollection,
        ctx: &ProxyContext,
        path: &mut VisitPath,
    ) -> Result<Option<Delta>, SyncError> {
        let mut entries = Vec::new();
        match (&self.items, &live.storage) {
            (CollectionItems::Seq(snapshots), CollectionStorage::Seq(elements)) => {
                if snapshots.len() != elements.len() && live.resize == ResizePolicy::Fixed {
                    return Ok(Some(Delta::Replace(Proxy::Collection(Self::load(
                        live, ctx, path,
                    )?))));
                }
                let prefix = snapshots.len().min(elements.len());
                for index in 0..prefix {
                    path.push(PathStep::Index(index));
                    if let Some(delta) = snapshots[index].diff(&elements[index], ctx, path)? {
                        entries.push((CollectionKey::Index(index), delta));
                    }
                    path.pop();
                }
                for index in (elements.len()..snapshots.len()).rev() {
                    entries.push((
                        CollectionKey::Index(index),
                        Delta::Deletion(snapshots[index].clone()),
                    ));
                }
                for (index, element) in elements.iter().enumerate().skip(snapshots.len()) {
                    path.push(PathStep::Index(index));
                    entries.push((
                        CollectionKey::Index(index),
                        Delta::Addition(Proxy::load(element, ctx, path)?),
                    ));
                    path.pop();
                }
            }
            (CollectionItems::Map(snapshots), CollectionStorage::Map(elements)) => {
                for (key, snapshot) in snapshots {
                    match elements.get(key) {
                        Some(element) => {
                            path.push(PathStep::name(key.clone()));
                            if let Some(delta) = snapshot.diff(element, ctx, path)? {
                                entries.push((CollectionKey::Key(key.clone()), delta));
                            }
                            path.pop();
                        }
                        None => entries.push((
                            CollectionKey::Key(key.clone()),
                            Delta::Deletion(snapshot.clone()),
                        )),
                    }
                }
                for (key, element) in elements {
                    if !snapshots.contains_key(key) {
                        path.push(PathStep::name(key.clone()));
                        entries.push((
                            CollectionKey::Key(key.clone()),
                            Delta::Addition(Proxy::load(element, ctx, path)?),
                        ));
                        path.pop();
                    }
                }
            }
            // storage kind changed underneath us
            _ => {
                return Ok(Some(Delta::Replace(Proxy::Collection(Self::load(
                    live, ctx, path,
                )?))))
            }
        }

        if entries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Delta::Update(DeltaValue::Collection(CollectionDelta {
                entries,
            }))))
        }
    }

    pub fn merge(&mut self, delta: &CollectionDelta) {
        for (key, entry) in &delta.entries {
            match (key, &mut self.items) {
                (CollectionKey::Index(index), CollectionItems::Seq(items)) => match entry {
                    Delta::Deletion(_) => {
                        if *index < items.len() {
                            items.remove(*index);
                        }
                    }
                    Delta::Addition(proxy) => {
                        let at = (*index).min(items.len());
                        items.insert(at, proxy.clone());
                    }
                    _ => {
                        if let Some(item) = items.get_mut(*index) {
                            item.merge(entry);
                        }
                    }
                },
                (CollectionKey::Key(key), CollectionItems::Map(items)) => match entry {
                    Delta::Deletion(_) => {
                        items.remove(key);
                    }
                    Delta::Addition(proxy) => {
                        items.insert(key.clone(), proxy.clone());
                    }
                    _ => {
                        if let Some(item) = items.get_mut(key) {
                            item.merge(entry);
                        }
                    }
                },
                _ => {}
            }
        }
    }

    /// Write an incoming entry-level delta through to the live collection
    pub fn apply(
        &mut self,
        delta: &CollectionDelta,
        live: &mut LiveCollection,
        path: &mut VisitPath,
        save: &mut SaveContext,
    ) -> Result<(), SyncError> {
        let resize = live.resize;
        for (key, entry) in &delta.entries {
            match (key, &mut self.items, &mut live.storage) {
                (
                    CollectionKey::Index(index),
                    CollectionItems::Seq(snapshots),
                    CollectionStorage::Seq(elements),
                ) => match entry {
                    Delta::Deletion(_) => {
                        if resize == ResizePolicy::Fixed {
                            return Err(SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "fixed-length collection cannot shrink".to_string(),
                            });
                        }
                        if *index < snapshots.len() {
                            snapshots.remove(*index);
                        }
                        if *index < elements.len() {
                            elements.remove(*index);
                        }
                    }
                    Delta::Addition(proxy) => {
                        if resize == ResizePolicy::Fixed {
                            return Err(SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "fixed-length collection cannot grow".to_string(),
                            });
                        }
                        path.push(PathStep::Index(*index));
                        let mut slot = LiveValue::None;
                        proxy.save(&mut slot, path, save)?;
                        path.pop();
                        elements.insert((*index).min(elements.len()), slot);
                        snapshots.insert((*index).min(snapshots.len()), proxy.clone());
                    }
                    _ => {
                        path.push(PathStep::Index(*index));
                        let (Some(snapshot), Some(slot)) =
                            (snapshots.get_mut(*index), elements.get_mut(*index))
                        else {
                            return Err(SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "update past the end of the collection".to_string(),
                            });
                        };
                        snapshot.apply(entry, slot, path, save)?;
                        path.pop();
                    }
                },
                (
                    CollectionKey::Key(key),
                    CollectionItems::Map(snapshots),
                    CollectionStorage::Map(elements),
                ) => match entry {
                    Delta::Deletion(_) => {
                        snapshots.remove(key);
                        elements.remove(key);
                    }
                    Delta::Addition(proxy) => {
                        path.push(PathStep::name(key.clone()));
                        let mut slot = LiveValue::None;
                        proxy.save(&mut slot, path, save)?;
                        path.pop();
                        elements.insert(key.clone(), slot);
                        snapshots.insert(key.clone(), proxy.clone());
                    }
                    _ => {
                        path.push(PathStep::name(key.clone()));
                        let (Some(snapshot), Some(slot)) =
                            (snapshots.get_mut(key), elements.get_mut(key))
                        else {
                            return Err(SyncError::StructuralMismatch {
                                path: path.to_string(),
                                reason: "update for a key the collection lacks".to_string(),
                            });
                        };
                        snapshot.apply(entry, slot, path, save)?;
                        path.pop();
                    }
                },
                _ => {
                    return Err(SyncError::StructuralMismatch {
                        path: path.to_string(),
                        reason: "collection delta shape does not match the storage".to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Materialize a live collection carrying every snapshotted entry
    pub fn save(
        &self,
        path: &mut VisitPath,
        save: &mut SaveContext,
    ) -> Result<LiveCollection, SyncError> {
        let mut live = match &self.items {
            CollectionItems::Seq(_) => LiveCollection::seq(self.resize),
            CollectionItems::Map(_) => LiveCollection::map(),
        };
        live.resize = self.resize;
        live.element_type = self.element_type.clone();

        match (&self.items, &mut live.storage) {
            (CollectionItems::Seq(items), CollectionStorage::Seq(elements)) => {
                for (index, proxy) in items.iter().enumerate() {
                    path.push(PathStep::Index(index));
                    let mut slot = LiveValue::None;
                    proxy.save(&mut slot, path, save)?;
                    path.pop();
                    elements.push(slot);
                }
            }
            (CollectionItems::Map(items), CollectionStorage::Map(elements)) => {
                for (key, proxy) in items {
                    path.push(PathStep::name(key.clone()));
                    let mut slot = LiveValue::None;
                    proxy.save(&mut slot, path, save)?;
                    path.pop();
                    elements.insert(key.clone(), slot);
                }
            }
            _ => {}
        }
        Ok(live)
    }

    pub(crate) fn referenced_uuids(&self, out: &mut Vec<EntityUuid>) {
        match &self.items {
            CollectionItems::Seq(items) => {
                for item in items {
                    item.referenced_uuids(out);
                }
            }
            CollectionItems::Map(items) => {
                for item in items.values() {
                    item.referenced_uuids(out);
                }
            }
        }
    }
}
