use crate::{error::CodecError, writer::ByteWriter};

pub type CommandId = u32;

/// Wire frame header: `[8B payload length][4B command id][2B message type]`
pub const FRAME_HEADER_BYTES: usize = 14;

/// Hard ceiling on a single frame's payload. A length prefix beyond this is
/// framing corruption and fatal to the connection.
pub const MAX_FRAME_BYTES: u64 = 1 << 31;

/// Message type tag carried in every frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    /// Presence attribute diff for one client
    ClientUpdate = 1,
    /// Presence attribute diff for the joined room
    RoomUpdate = 2,
    /// An inner command prefixed with the sender's client id, so a relay
    /// echoing room traffic back never re-applies the sender's own work
    ClientIdWrapper = 3,
    /// Full proxy for a newly created top-level entity
    EntityCreate = 10,
    /// Delta for an existing top-level entity
    EntityUpdate = 11,
    /// Entity removal: uuid + debug string
    EntityRemove = 12,
    /// Flattened (uuid, old name, new name) triples
    EntityRename = 13,
    /// Externally-stored binary payload referenced by an entity
    BulkMedia = 14,
}

impl MessageType {
    pub fn from_u16(value: u16) -> Result<Self, CodecError> {
        match value {
            1 => Ok(MessageType::ClientUpdate),
            2 => Ok(MessageType::RoomUpdate),
            3 => Ok(MessageType::ClientIdWrapper),
            10 => Ok(MessageType::EntityCreate),
            11 => Ok(MessageType::EntityUpdate),
            12 => Ok(MessageType::EntityRemove),
            13 => Ok(MessageType::EntityRename),
            14 => Ok(MessageType::BulkMedia),
            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}

/// One wire message: type tag, monotonically increasing id, opaque payload.
/// Consumed exactly once by the receiving peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub id: CommandId,
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl Command {
    pub fn new(id: CommandId, message_type: MessageType, payload: Vec<u8>) -> Self {
        Self {
            id,
            message_type,
            payload,
        }
    }

    /// Serialize into a complete frame, header included
    pub fn to_frame(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(FRAME_HEADER_BYTES + self.payload.len());
        writer.write_u64(self.payload.len() as u64);
        writer.write_u32(self.id);
        writer.write_u16(self.message_type as u16);
        writer.write_raw(&self.payload);
        writer.into_bytes()
    }
}

/// Incremental frame decoder.
///
/// Feed it byte chunks of any size; it buffers partial frames and yields
/// complete [`Command`]s as they become available. Errors returned from
/// [`CommandCodec::next_command`] indicate framing corruption and the
/// connection must be torn down — payload contents are not inspected here.
#[derive(Debug, Default)]
pub struct CommandCodec {
    buffer: Vec<u8>,
}

impl CommandCodec {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes currently buffered (complete or partial frames)
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Pop the next complete frame, if one is buffered
    pub fn next_command(&mut self) -> Result<Option<Command>, CodecError> {
        if self.buffer.len() < FRAME_HEADER_BYTES {
            return Ok(None);
        }

        let payload_len = u64::from_le_bytes(self.buffer[0..8].try_into().unwrap());
        if payload_len > MAX_FRAME_BYTES {
            return Err(CodecError::FrameTooLarge {
                len: payload_len,
                max: MAX_FRAME_BYTES,
            });
        }

        let frame_len = FRAME_HEADER_BYTES + payload_len as usize;
        if self.buffer.len() < frame_len {
            return Ok(None);
        }

        let id = u32::from_le_bytes(self.buffer[8..12].try_into().unwrap());
        let type_tag = u16::from_le_bytes(self.buffer[12..14].try_into().unwrap());
        let message_type = MessageType::from_u16(type_tag)?;
        let payload = self.buffer[FRAME_HEADER_BYTES..frame_len].to_vec();
        self.buffer.drain(..frame_len);

        Ok(Some(Command::new(id, message_type, payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrip_across_split_reads() {
        let command = Command::new(7, MessageType::EntityUpdate, b"twelve bytes".to_vec());
        let frame = command.to_frame();
        assert_eq!(frame.len(), FRAME_HEADER_BYTES + 12);

        // split at every possible boundary
        for split in 0..frame.len() {
            let mut codec = CommandCodec::new();
            codec.feed(&frame[..split]);
            let _ = codec.next_command().unwrap();
            codec.feed(&frame[split..]);
            let mut decoded = None;
            while let Some(cmd) = codec.next_command().unwrap() {
                decoded = Some(cmd);
            }
            let decoded = decoded.unwrap_or_else(|| panic!("no frame at split {split}"));
            assert_eq!(decoded, command);
        }
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let first = Command::new(1, MessageType::EntityCreate, vec![1, 2, 3]);
        let second = Command::new(2, MessageType::EntityRemove, vec![]);
        let mut bytes = first.to_frame();
        bytes.extend(second.to_frame());

        let mut codec = CommandCodec::new();
        codec.feed(&bytes);
        assert_eq!(codec.next_command().unwrap(), Some(first));
        assert_eq!(codec.next_command().unwrap(), Some(second));
        assert_eq!(codec.next_command().unwrap(), None);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn oversized_length_prefix_is_fatal() {
        let mut codec = CommandCodec::new();
        let mut bytes = (MAX_FRAME_BYTES + 1).to_le_bytes().to_vec();
        bytes.extend([0u8; 6]);
        codec.feed(&bytes);
        assert!(matches!(
            codec.next_command(),
            Err(CodecError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn unknown_message_type_is_fatal() {
        let mut frame = Command::new(1, MessageType::ClientUpdate, vec![]).to_frame();
        frame[12] = 0xff;
        frame[13] = 0xff;
        let mut codec = CommandCodec::new();
        codec.feed(&frame);
        assert_eq!(
            codec.next_command(),
            Err(CodecError::UnknownMessageType(0xffff))
        );
    }
}
