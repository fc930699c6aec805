//! Top-level entity diffing.
//!
//! Works on identity, not content: assigns uuids to entities seen for the
//! first time, resolves duplicate uuids, and reports which entities
//! appeared, disappeared or were renamed since the snapshots were taken.
//! Renames are identity-preserving; the uuid never changes with the name.

use std::collections::HashMap;

use log::warn;

use crate::{
    graph::GraphRegistry,
    proxy::DatablockProxies,
    types::EntityUuid,
};

/// Which of two entities claiming the same uuid keeps it.
///
/// The loser is re-keyed with a fresh uuid and shows up as a new entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// An entity from an external library keeps the uuid; the local copy
    /// is re-keyed. The usual case: the library copy is the original.
    #[default]
    PreferLinked,
    /// The local entity keeps the uuid
    PreferLocal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEvent {
    pub uuid: EntityUuid,
    pub old_name: String,
    pub new_name: String,
}

/// What changed at the top level since the snapshots were taken
#[derive(Debug, Default, PartialEq)]
pub struct TopLevelChanges {
    /// Entities with no snapshot, with their owning collection
    pub added: Vec<(String, EntityUuid)>,
    /// Snapshots with no live entity left
    pub removed: Vec<(String, EntityUuid)>,
    pub renamed: Vec<RenameEvent>,
}

impl TopLevelChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.renamed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct GraphDiffer {
    policy: CollisionPolicy,
}

impl GraphDiffer {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self { policy }
    }

    /// Settle identities in the live graph, then report top-level changes
    /// against the held snapshots
    pub fn compute(
        &self,
        registry: &mut GraphRegistry,
        proxies: &DatablockProxies,
    ) -> TopLevelChanges {
        self.assign_identities(registry);

        let mut changes = TopLevelChanges::default();
        let names: Vec<String> = registry.collection_names().map(str::to_string).collect();
        for name in &names {
            let Some(datablocks) = registry.collection(name) else {
                continue;
            };
            for datablock in datablocks {
                let Some(uuid) = datablock.uuid else {
                    continue;
                };
                match proxies.find(uuid) {
                    None => changes.added.push((name.clone(), uuid)),
                    Some((_, proxy)) => {
                        // linked entities are never renamed from this side
                        if !datablock.linked && proxy.name != datablock.name {
                            changes.renamed.push(RenameEvent {
                                uuid,
                                old_name: proxy.name.clone(),
                                new_name: datablock.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        for (collection, proxy) in proxies.iter() {
            if !registry.contains(proxy.uuid) {
                changes.removed.push((collection.to_string(), proxy.uuid));
            }
        }
        changes
    }

    /// Give every entity a uuid and make sure no two entities share one
    fn assign_identities(&self, registry: &mut GraphRegistry) {
        let names: Vec<String> = registry.collection_names().map(str::to_string).collect();

        let mut sightings: HashMap<EntityUuid, Vec<(String, usize, bool)>> = HashMap::new();
        for name in &names {
            let Some(datablocks) = registry.collection_mut(name) else {
                continue;
            };
            for (index, datablock) in datablocks.iter_mut().enumerate() {
                let uuid = match datablock.uuid {
                    Some(uuid) => uuid,
                    None => {
                        let uuid = EntityUuid::generate();
                        datablock.uuid = Some(uuid);
                        uuid
                    }
                };
                sightings
                    .entry(uuid)
                    .or_default()
                    .push((name.clone(), index, datablock.linked));
            }
        }

        let prefer_linked = self.policy == CollisionPolicy::PreferLinked;
        for (uuid, group) in sightings {
            if group.len() < 2 {
                continue;
            }
            warn!("duplicate uuid {uuid} on {} entities, re-keying", group.len());
            let keeper = group
                .iter()
                .position(|(_, _, linked)| *linked == prefer_linked)
                .unwrap_or(0);
            for (slot, (collection, index, _)) in group.iter().enumerate() {
                if slot == keeper {
                    continue;
                }
                if let Some(datablocks) = registry.collection_mut(collection) {
                    if let Some(datablock) = datablocks.get_mut(*index) {
                        datablock.uuid = Some(EntityUuid::generate());
                    }
                }
            }
        }
    }
}
