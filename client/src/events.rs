use meld_shared::EntityUuid;

use crate::{attributes::AttributeDict, connection::ConnectionStatus};

/// Everything a tick can surface to the embedding application.
///
/// Per-entity failures arrive as [`SessionEvent::EntityFailed`] entries;
/// the rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged {
        status: ConnectionStatus,
    },
    EntityCreated {
        collection: String,
        uuid: EntityUuid,
    },
    EntityUpdated {
        uuid: EntityUuid,
    },
    EntityRemoved {
        uuid: EntityUuid,
        display_name: String,
    },
    EntityRenamed {
        uuid: EntityUuid,
        old_name: String,
        new_name: String,
    },
    /// One entity of an incoming batch could not be applied; its siblings
    /// were processed anyway
    EntityFailed {
        uuid: Option<EntityUuid>,
        error: String,
    },
    /// Raw external media received; storing it is the embedder's job
    MediaReceived {
        path: String,
        content: Vec<u8>,
    },
    ClientAttributesChanged {
        changed: AttributeDict,
    },
    RoomAttributesChanged {
        changed: AttributeDict,
    },
}
