use thiserror::Error;

use meld_codec::CodecError;

use crate::types::EntityUuid;

/// Errors raised by the synchronization core.
///
/// Per-entity failures are isolated by callers: one entity failing never
/// aborts processing of its siblings in the same batch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed or truncated wire buffer. The message is dropped and
    /// logged; the connection survives unless the framing itself is corrupt.
    #[error("wire decode failed: {0}")]
    Decode(#[from] CodecError),

    /// JSON-encoded proxy payload could not be parsed
    #[error("json payload malformed: {0}")]
    Json(#[from] serde_json::Error),

    /// A referenced external resource could not be loaded; the specific
    /// entity is abandoned, the rest of the batch proceeds
    #[error("external resource unavailable: {path}")]
    ExternalResourceFailure { path: String },

    /// Two entities shared a uuid; resolved deterministically, never fatal
    #[error("duplicate uuid {uuid}")]
    IdentityConflict { uuid: EntityUuid },

    /// Collection length/shape cannot be reconciled incrementally;
    /// escalated to a whole-subtree replace
    #[error("structure at {path} cannot be reconciled incrementally: {reason}")]
    StructuralMismatch { path: String, reason: String },

    /// A required attribute is missing; corrupts identity, so the owning
    /// proxy is discarded and re-created from the next full load
    #[error("required attribute {field:?} missing at {path}")]
    MissingAttribute { path: String, field: String },

    /// No entity with this uuid is known to the session
    #[error("unknown entity {uuid}")]
    UnknownEntity { uuid: EntityUuid },

    /// Uuid string on the wire did not parse
    #[error("malformed uuid {text:?}")]
    MalformedUuid { text: String },
}
