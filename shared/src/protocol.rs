use std::time::Duration;

use crate::{
    diff::CollisionPolicy,
    filter::{FilterBuilder, SchemaFilter, TypeSpec},
};

pub mod error;
pub use error::ProtocolError;

/// Session-wide configuration, built once at startup and locked before
/// the first connection.
///
/// Everything the synchronization core consults mid-session lives here:
/// which top-level collections are scanned, how each type is filtered,
/// and how identity collisions resolve. Locking freezes it; a locked
/// protocol rejects further changes.
pub struct SyncProtocol {
    specs: Vec<TypeSpec>,
    filter: SchemaFilter,
    /// Top-level registry collections the session scans and synchronizes
    pub collections: Vec<String>,
    pub collision_policy: CollisionPolicy,
    /// Artificial delay before outgoing commands are flushed, for
    /// latency testing
    pub command_delay: Option<Duration>,
    locked: bool,
}

impl Default for SyncProtocol {
    fn default() -> Self {
        Self {
            specs: Vec::new(),
            filter: SchemaFilter::default(),
            collections: Vec::new(),
            collision_policy: CollisionPolicy::default(),
            command_delay: None,
            locked: false,
        }
    }
}

impl SyncProtocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, spec: TypeSpec) -> &mut Self {
        self.check_lock();
        self.specs.push(spec);
        self
    }

    pub fn add_collection(&mut self, name: impl Into<String>) -> &mut Self {
        self.check_lock();
        self.collections.push(name.into());
        self
    }

    pub fn collision_policy(&mut self, policy: CollisionPolicy) -> &mut Self {
        self.check_lock();
        self.collision_policy = policy;
        self
    }

    pub fn command_delay(&mut self, delay: Duration) -> &mut Self {
        self.check_lock();
        self.command_delay = Some(delay);
        self
    }

    // Non-panicking builder methods

    pub fn try_add_type(&mut self, spec: TypeSpec) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.specs.push(spec);
        Ok(self)
    }

    pub fn try_add_collection(
        &mut self,
        name: impl Into<String>,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.collections.push(name.into());
        Ok(self)
    }

    pub fn try_collision_policy(
        &mut self,
        policy: CollisionPolicy,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.collision_policy = policy;
        Ok(self)
    }

    pub fn try_command_delay(&mut self, delay: Duration) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.command_delay = Some(delay);
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.freeze();
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.freeze();
    }

    fn freeze(&mut self) {
        let mut builder = FilterBuilder::new();
        for spec in self.specs.drain(..) {
            builder = builder.register(spec);
        }
        self.filter = builder.build();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The compiled per-type filter. Empty until the protocol locks.
    pub fn filter(&self) -> &SchemaFilter {
        &self.filter
    }

    /// Checks if the protocol is locked without panicking
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if the protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("SyncProtocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_compiles_the_filter_and_freezes() {
        let mut protocol = SyncProtocol::builder();
        protocol
            .add_collection("objects")
            .add_type(TypeSpec::new("Object").deny(&["internal_cache"]));
        protocol.lock();

        assert!(protocol.is_locked());
        assert!(protocol.filter().spec("Object").is_some());
        assert_eq!(
            protocol.try_add_collection("meshes").err(),
            Some(ProtocolError::AlreadyLocked)
        );
    }

    #[test]
    #[should_panic(expected = "already locked")]
    fn panicking_builder_respects_the_lock() {
        let mut protocol = SyncProtocol::builder();
        protocol.lock();
        protocol.add_collection("objects");
    }
}
