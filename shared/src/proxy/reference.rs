use serde::{Deserialize, Serialize};

use crate::{
    graph::{LiveValue, VisitPath},
    proxy::SaveContext,
    types::EntityUuid,
};

/// Snapshot of a weak cross-entity link: identity only.
///
/// A changed reference always ships whole; there is nothing hollow about
/// a link. On the write side the live slot gets a placeholder and the
/// target uuid goes to the save context for deferred settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceProxy {
    pub target: Option<EntityUuid>,
}

impl ReferenceProxy {
    pub fn new(target: Option<EntityUuid>) -> Self {
        Self { target }
    }

    pub fn save(&self, slot: &mut LiveValue, path: &VisitPath, save: &mut SaveContext) {
        *slot = LiveValue::Reference(None);
        if let Some(target) = self.target {
            save.record(target, path.clone());
        }
    }
}
