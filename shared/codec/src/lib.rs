//! # Meld Codec
//! Byte-level wire codec shared by the meld client & relay: little-endian
//! primitives, typed numeric arrays, and the length-framed `Command` layer.

mod command;
mod error;
mod reader;
mod serde;
mod typed_array;
mod writer;

pub use command::{
    Command, CommandCodec, CommandId, MessageType, FRAME_HEADER_BYTES, MAX_FRAME_BYTES,
};
pub use error::CodecError;
pub use reader::ByteReader;
pub use serde::{Decode, Encode};
pub use typed_array::{TypeCode, TypedArray};
pub use writer::ByteWriter;
