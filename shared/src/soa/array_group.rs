use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    filter::BulkSpec,
    graph::{CollectionStorage, LiveCollection, ResizePolicy, VisitPath},
    soa::{AosElement, SoaElement},
};

/// Transposed view of one bulk collection: every configured field across
/// every element, as flat SOA buffers plus sparse AOS dictionaries.
///
/// Diffing a group compares whole buffers; application replaces whole
/// buffers. A group update carries only the fields whose buffers changed,
/// except when the element count changed, which always ships the full
/// group so the receiver can rebuild every buffer at the new length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayGroupProxy {
    /// Element count the group was read at
    pub len: usize,
    /// Element type name, kept so a full save can materialize a fresh
    /// collection from scratch
    pub element_type: Option<String>,
    pub soa: BTreeMap<String, SoaElement>,
    pub aos: BTreeMap<String, AosElement>,
}

impl ArrayGroupProxy {
    /// Transpose an ordered collection into per-field buffers
    pub fn load(
        collection: &LiveCollection,
        spec: &BulkSpec,
        path: &VisitPath,
    ) -> Result<Self, SyncError> {
        let CollectionStorage::Seq(elements) = &collection.storage else {
            return Err(SyncError::StructuralMismatch {
                path: path.to_string(),
                reason: "bulk field is not an ordered collection".to_string(),
            });
        };

        let mut soa = BTreeMap::new();
        for field in &spec.soa_fields {
            let element =
                SoaElement::read(elements, &field.name, field.code, field.components, path)?;
            soa.insert(field.name.clone(), element);
        }

        let mut aos = BTreeMap::new();
        for field in &spec.aos_fields {
            let element = AosElement::read(elements, field);
            if !element.is_empty() {
                aos.insert(field.clone(), element);
            }
        }

        Ok(Self {
            len: elements.len(),
            element_type: collection.element_type.clone(),
            soa,
            aos,
        })
    }

    /// Group update turning `self` (last-synced) into `current`.
    ///
    /// Returns `None` when no buffer changed. A length change returns the
    /// full current group; otherwise only the changed fields ride along.
    pub fn diff(&self, current: &ArrayGroupProxy) -> Option<ArrayGroupProxy> {
        if self.len != current.len {
            return Some(current.clone());
        }

        let soa: BTreeMap<String, SoaElement> = current
            .soa
            .iter()
            .filter(|(name, element)| self.soa.get(*name) != Some(element))
            .map(|(name, element)| (name.clone(), element.clone()))
            .collect();
        let aos: BTreeMap<String, AosElement> = current
            .aos
            .iter()
            .filter(|(name, element)| self.aos.get(*name) != Some(element))
            .map(|(name, element)| (name.clone(), element.clone()))
            .collect();

        if soa.is_empty() && aos.is_empty() {
            return None;
        }
        Some(ArrayGroupProxy {
            len: current.len,
            element_type: current.element_type.clone(),
            soa,
            aos,
        })
    }

    /// Fold a (possibly partial) group update into this last-synced group
    pub fn merge(&mut self, update: &ArrayGroupProxy) {
        self.len = update.len;
        for (name, element) in &update.soa {
            self.soa.insert(name.clone(), element.clone());
        }
        for (name, element) in &update.aos {
            self.aos.insert(name.clone(), element.clone());
        }
    }

    /// Build a fresh live collection out of the carried buffers
    pub fn materialize(&self, path: &VisitPath) -> Result<LiveCollection, SyncError> {
        let mut collection = LiveCollection::seq(ResizePolicy::Resizable);
        collection.element_type = self.element_type.clone();
        self.write_back(&mut collection, path)?;
        Ok(collection)
    }

    /// Write every carried buffer back into the live collection, resizing
    /// it first when the element count changed
    pub fn write_back(
        &self,
        collection: &mut LiveCollection,
        path: &VisitPath,
    ) -> Result<(), SyncError> {
        if collection.len() != self.len && collection.resize == ResizePolicy::Fixed {
            return Err(SyncError::StructuralMismatch {
                path: path.to_string(),
                reason: format!(
                    "fixed-length collection cannot resize from {} to {}",
                    collection.len(),
                    self.len
                ),
            });
        }
        let template = collection.new_element();
        let CollectionStorage::Seq(elements) = &mut collection.storage else {
            return Err(SyncError::StructuralMismatch {
                path: path.to_string(),
                reason: "bulk field is not an ordered collection".to_string(),
            });
        };
        elements.resize(self.len, template);

        for (index, element) in elements.iter_mut().enumerate() {
            let Some(target) = element.as_struct_mut() else {
                return Err(SyncError::StructuralMismatch {
                    path: path.to_string(),
                    reason: "bulk collection element is not a struct".to_string(),
                });
            };
            for (name, soa) in &self.soa {
                soa.write_element(index, name, target);
            }
            for (name, aos) in &self.aos {
                aos.write_element(index, name, target);
            }
        }
        Ok(())
    }
}
