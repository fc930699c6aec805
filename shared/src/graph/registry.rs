use std::collections::BTreeMap;

use crate::{graph::value::LiveStruct, types::EntityUuid};

/// One independently-identified top-level entity in the live graph
#[derive(Debug, Clone, PartialEq)]
pub struct LiveDatablock {
    /// Assigned on first sight by the top-level diff engine; stable across
    /// renames
    pub uuid: Option<EntityUuid>,
    pub name: String,
    /// Managed by an external/read-only source; renames are never applied
    /// to linked datablocks and collisions resolve in their favor
    pub linked: bool,
    pub root: LiveStruct,
}

impl LiveDatablock {
    pub fn new(name: impl Into<String>, root: LiveStruct) -> Self {
        Self {
            uuid: None,
            name: name.into(),
            linked: false,
            root,
        }
    }

    pub fn with_uuid(mut self, uuid: EntityUuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn linked(mut self) -> Self {
        self.linked = true;
        self
    }
}

/// The live graph's root: named collections of datablocks, with uuid lookup.
///
/// This is the registry the reference resolver patches against; it maps
/// uuid to live entity but never owns cross-entity links itself.
#[derive(Debug, Default)]
pub struct GraphRegistry {
    collections: BTreeMap<String, Vec<LiveDatablock>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&mut self, name: impl Into<String>) -> &mut Self {
        self.collections.entry(name.into()).or_default();
        self
    }

    pub fn insert(&mut self, collection: &str, datablock: LiveDatablock) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(datablock);
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn collection(&self, name: &str) -> Option<&[LiveDatablock]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Vec<LiveDatablock>> {
        self.collections.get_mut(name)
    }

    pub fn contains(&self, uuid: EntityUuid) -> bool {
        self.find(uuid).is_some()
    }

    pub fn find(&self, uuid: EntityUuid) -> Option<(&str, &LiveDatablock)> {
        for (name, datablocks) in &self.collections {
            for datablock in datablocks {
                if datablock.uuid == Some(uuid) {
                    return Some((name.as_str(), datablock));
                }
            }
        }
        None
    }

    pub fn find_mut(&mut self, uuid: EntityUuid) -> Option<&mut LiveDatablock> {
        for datablocks in self.collections.values_mut() {
            for datablock in datablocks {
                if datablock.uuid == Some(uuid) {
                    return Some(datablock);
                }
            }
        }
        None
    }

    pub fn remove(&mut self, uuid: EntityUuid) -> Option<LiveDatablock> {
        for datablocks in self.collections.values_mut() {
            if let Some(index) = datablocks.iter().position(|d| d.uuid == Some(uuid)) {
                return Some(datablocks.remove(index));
            }
        }
        None
    }

    pub fn rename(&mut self, uuid: EntityUuid, new_name: &str) -> bool {
        match self.find_mut(uuid) {
            Some(datablock) => {
                datablock.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn name_taken(&self, collection: &str, name: &str) -> bool {
        self.collection(collection)
            .is_some_and(|datablocks| datablocks.iter().any(|d| d.name == name))
    }

    /// Total datablock count across every collection
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
