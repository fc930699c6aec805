//! Deferred cross-entity reference settlement.
//!
//! A reference can arrive before its target exists; the slot is parked
//! here, keyed by the missing target's uuid, and patched the moment the
//! target registers. Entries wait indefinitely; a target that never
//! arrives leaves its slots unresolved rather than failing the session.

use std::collections::HashMap;

use log::warn;

use crate::{
    graph::{navigate_mut, GraphRegistry, LiveValue, VisitPath},
    types::EntityUuid,
};

/// One parked reference slot: the entity that owns it and the path to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRef {
    pub datablock: EntityUuid,
    pub path: VisitPath,
}

/// Reference slots waiting for their target, in registration order
#[derive(Debug, Default)]
pub struct UnresolvedRefs {
    pending: HashMap<EntityUuid, Vec<PendingRef>>,
}

impl UnresolvedRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, target: EntityUuid, pending: PendingRef) {
        self.pending.entry(target).or_default().push(pending);
    }

    pub fn waiting_on(&self, target: EntityUuid) -> bool {
        self.pending.contains_key(&target)
    }

    /// Whether an entity still has unpatched reference slots. Such an
    /// entity is incompletely applied and is excluded from outgoing diffs
    /// until its links settle.
    pub fn owner_pending(&self, datablock: EntityUuid) -> bool {
        self.pending
            .values()
            .any(|entries| entries.iter().any(|e| e.datablock == datablock))
    }

    /// Parked slot count across every target
    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain every slot waiting on `target` and patch it in the live
    /// graph. Slots whose owner or path no longer exists are logged and
    /// skipped. Returns the number of slots patched.
    pub fn resolve(&mut self, target: EntityUuid, registry: &mut GraphRegistry) -> usize {
        let Some(pending) = self.pending.remove(&target) else {
            return 0;
        };
        let mut patched = 0;
        for entry in pending {
            let Some(owner) = registry.find_mut(entry.datablock) else {
                warn!(
                    "dropping parked reference: owner {} is gone",
                    entry.datablock
                );
                continue;
            };
            let Some(slot) = navigate_mut(&mut owner.root, &entry.path) else {
                warn!(
                    "dropping parked reference: path {} no longer exists in {}",
                    entry.path, owner.name
                );
                continue;
            };
            *slot = LiveValue::Reference(Some(target));
            patched += 1;
        }
        patched
    }

    /// Forget every slot owned by a removed entity
    pub fn forget_owner(&mut self, datablock: EntityUuid) {
        self.pending
            .values_mut()
            .for_each(|entries| entries.retain(|e| e.datablock != datablock));
        self.pending.retain(|_, entries| !entries.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LiveDatablock, LiveStruct, PathStep};

    fn registry_with_object(uuid: EntityUuid) -> GraphRegistry {
        let root = LiveStruct::new("Object").with_field("parent", LiveValue::Reference(None));
        let mut registry = GraphRegistry::new();
        registry.insert("objects", LiveDatablock::new("cube", root).with_uuid(uuid));
        registry
    }

    fn parent_path() -> VisitPath {
        let mut path = VisitPath::root();
        path.push(PathStep::name("parent"));
        path
    }

    #[test]
    fn parked_slot_is_patched_when_target_registers() {
        let owner = EntityUuid::generate();
        let target = EntityUuid::generate();
        let mut registry = registry_with_object(owner);

        let mut refs = UnresolvedRefs::new();
        refs.append(
            target,
            PendingRef {
                datablock: owner,
                path: parent_path(),
            },
        );
        assert!(refs.waiting_on(target));

        assert_eq!(refs.resolve(target, &mut registry), 1);
        assert!(refs.is_empty());
        let live = registry.find_mut(owner).unwrap();
        assert_eq!(
            live.root.field("parent"),
            Some(&LiveValue::Reference(Some(target)))
        );
    }

    #[test]
    fn missing_owner_is_skipped_not_fatal() {
        let target = EntityUuid::generate();
        let mut registry = GraphRegistry::new();

        let mut refs = UnresolvedRefs::new();
        refs.append(
            target,
            PendingRef {
                datablock: EntityUuid::generate(),
                path: parent_path(),
            },
        );
        assert_eq!(refs.resolve(target, &mut registry), 0);
        assert!(refs.is_empty());
    }

    #[test]
    fn removed_owner_forgets_its_slots() {
        let owner = EntityUuid::generate();
        let target = EntityUuid::generate();
        let mut refs = UnresolvedRefs::new();
        refs.append(
            target,
            PendingRef {
                datablock: owner,
                path: parent_path(),
            },
        );
        refs.forget_owner(owner);
        assert!(refs.is_empty());
    }
}
