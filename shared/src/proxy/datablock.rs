use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    graph::{LiveDatablock, VisitPath},
    proxy::{ProxyContext, SaveContext, StructDelta, StructProxy},
    types::EntityUuid,
};

/// Snapshot of one top-level entity: identity plus its root struct.
///
/// The uuid is assigned by the top-level diff engine before the first
/// load, so a datablock proxy always knows who it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatablockProxy {
    pub uuid: EntityUuid,
    pub name: String,
    pub linked: bool,
    pub root: StructProxy,
}

impl DatablockProxy {
    pub fn load(live: &LiveDatablock, ctx: &ProxyContext) -> Result<Self, SyncError> {
        let uuid = live.uuid.ok_or_else(|| SyncError::MissingAttribute {
            path: live.name.clone(),
            field: "uuid".to_string(),
        })?;
        let mut path = VisitPath::root();
        Ok(Self {
            uuid,
            name: live.name.clone(),
            linked: live.linked,
            root: StructProxy::load(&live.root, ctx, &mut path)?,
        })
    }

    /// Structural delta only; renames travel as their own messages
    pub fn diff(
        &self,
        live: &LiveDatablock,
        ctx: &ProxyContext,
    ) -> Result<Option<StructDelta>, SyncError> {
        let mut path = VisitPath::root();
        self.root.diff(&live.root, ctx, &mut path)
    }

    pub fn merge(&mut self, delta: &StructDelta) {
        self.root.merge(delta);
    }

    pub fn apply(
        &mut self,
        delta: &StructDelta,
        live: &mut LiveDatablock,
        save: &mut SaveContext,
    ) -> Result<(), SyncError> {
        let mut path = VisitPath::root();
        self.root.apply(delta, &mut live.root, &mut path, save)
    }

    /// Materialize a fresh live datablock from this snapshot
    pub fn materialize(&self, save: &mut SaveContext) -> Result<LiveDatablock, SyncError> {
        let mut path = VisitPath::root();
        let root = self.root.save(&mut path, save)?;
        let mut live = LiveDatablock::new(self.name.clone(), root).with_uuid(self.uuid);
        live.linked = self.linked;
        Ok(live)
    }

    /// Uuids of every entity this snapshot's reference slots point at
    pub fn referenced_uuids(&self) -> Vec<EntityUuid> {
        let mut out = Vec::new();
        for field in self.root.fields.values() {
            field.referenced_uuids(&mut out);
        }
        out
    }
}

/// Every datablock snapshot the session holds, keyed the same way the
/// registry keys the live graph: collection name, then uuid
#[derive(Debug, Default)]
pub struct DatablockProxies {
    collections: BTreeMap<String, BTreeMap<EntityUuid, DatablockProxy>>,
}

impl DatablockProxies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, proxy: DatablockProxy) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(proxy.uuid, proxy);
    }

    pub fn contains(&self, uuid: EntityUuid) -> bool {
        self.find(uuid).is_some()
    }

    pub fn find(&self, uuid: EntityUuid) -> Option<(&str, &DatablockProxy)> {
        for (name, proxies) in &self.collections {
            if let Some(proxy) = proxies.get(&uuid) {
                return Some((name.as_str(), proxy));
            }
        }
        None
    }

    pub fn find_mut(&mut self, uuid: EntityUuid) -> Option<&mut DatablockProxy> {
        self.collections
            .values_mut()
            .find_map(|proxies| proxies.get_mut(&uuid))
    }

    pub fn remove(&mut self, uuid: EntityUuid) -> Option<DatablockProxy> {
        self.collections
            .values_mut()
            .find_map(|proxies| proxies.remove(&uuid))
    }

    pub fn collection(&self, name: &str) -> impl Iterator<Item = &DatablockProxy> {
        self.collections
            .get(name)
            .into_iter()
            .flat_map(|proxies| proxies.values())
    }

    /// Every snapshot, with its owning collection name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatablockProxy)> {
        self.collections
            .iter()
            .flat_map(|(name, proxies)| proxies.values().map(move |p| (name.as_str(), p)))
    }

    pub fn uuids(&self) -> Vec<EntityUuid> {
        self.collections
            .values()
            .flat_map(|proxies| proxies.keys().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
