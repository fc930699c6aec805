use crate::{filter::SchemaFilter, graph::VisitPath, types::EntityUuid};

/// Read-side traversal context shared by load and diff
#[derive(Debug, Clone, Copy)]
pub struct ProxyContext<'a> {
    pub filter: &'a SchemaFilter,
}

impl<'a> ProxyContext<'a> {
    pub fn new(filter: &'a SchemaFilter) -> Self {
        Self { filter }
    }
}

/// A reference slot written during save/apply, waiting to be settled
/// against the registry once the whole batch has landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCandidate {
    pub target: EntityUuid,
    pub path: VisitPath,
}

/// Write-side traversal context.
///
/// Save and apply never chase cross-entity links themselves; they write a
/// placeholder and record the slot here. The session settles candidates
/// after the batch, patching slots whose target exists and parking the
/// rest with the resolver.
#[derive(Debug, Default)]
pub struct SaveContext {
    refs: Vec<RefCandidate>,
}

impl SaveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target: EntityUuid, path: VisitPath) {
        self.refs.push(RefCandidate { target, path });
    }

    pub fn candidates(&self) -> &[RefCandidate] {
        &self.refs
    }

    pub fn take_candidates(&mut self) -> Vec<RefCandidate> {
        std::mem::take(&mut self.refs)
    }
}
