//! # Meld Shared
//! Common functionality shared between the meld client and relay tooling:
//! the proxy core, bulk-array subsystem, top-level diff engine, reference
//! resolver, schema filter and message payload codecs.

mod error;
mod types;

mod diff;
mod filter;
mod graph;
mod messages;
mod protocol;
mod proxy;
mod resolver;
mod soa;

pub use error::SyncError;
pub use types::EntityUuid;

pub use meld_codec::{
    ByteReader, ByteWriter, CodecError, Command, CommandCodec, CommandId, MessageType, TypeCode,
    TypedArray, FRAME_HEADER_BYTES, MAX_FRAME_BYTES,
};

pub use diff::{CollisionPolicy, GraphDiffer, RenameEvent, TopLevelChanges};
pub use filter::{
    BulkSpec, FieldDescriptor, FieldKind, FilterBuilder, SchemaFilter, SoaFieldSpec, TypeSpec,
};
pub use graph::{
    navigate_mut, CollectionStorage, GraphRegistry, LiveCollection, LiveDatablock, LiveStruct,
    LiveValue, PathStep, ResizePolicy, VisitPath,
};
pub use messages::{
    decode_attributes, decode_create, decode_media, decode_remove, decode_rename, decode_update,
    decode_wrapped, encode_attributes, encode_create, encode_media, encode_remove, encode_rename,
    encode_update, encode_wrapped, CreatePayload, UpdatePayload,
};
pub use protocol::{ProtocolError, SyncProtocol};
pub use proxy::{
    CollectionDelta, CollectionItems, CollectionKey, CollectionProxy, DatablockProxies,
    DatablockProxy, Delta, DeltaValue, Proxy, ProxyContext, RefCandidate, ReferenceProxy,
    SaveContext, ScalarValue, StructDelta, StructProxy,
};
pub use resolver::{PendingRef, UnresolvedRefs};
pub use soa::{AosElement, ArrayGroupProxy, SoaElement};
