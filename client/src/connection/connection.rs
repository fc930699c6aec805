use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use log::{debug, trace};

use meld_shared::{encode_wrapped, Command, CommandCodec, CommandId, MessageType};

use crate::{error::ClientError, transport::Transport};

const READ_CHUNK_BYTES: usize = 16 * 1024;

/// One live wire connection: framing state, the outgoing FIFO and the
/// command id counter.
///
/// Commands queue in order and flush as a single burst, so one tick's
/// deltas leave together. Every flushed command is wrapped with this
/// client's identity; a relay that echoes room traffic back hands the
/// session its own id, which it drops. An optional inter-command delay
/// holds each command back after it is queued, for latency testing; it
/// never reorders.
pub struct Connection {
    transport: Box<dyn Transport>,
    codec: CommandCodec,
    outgoing: VecDeque<(Instant, Command)>,
    next_command_id: CommandId,
    client_id: String,
    command_delay: Option<Duration>,
}

impl Connection {
    pub fn new(
        transport: Box<dyn Transport>,
        client_id: String,
        command_delay: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            codec: CommandCodec::new(),
            outgoing: VecDeque::new(),
            next_command_id: 1,
            client_id,
            command_delay,
        }
    }

    /// Queue a command for the next flush; returns its id
    pub fn queue(&mut self, message_type: MessageType, payload: Vec<u8>) -> CommandId {
        let id = self.next_command_id;
        self.next_command_id += 1;
        self.outgoing
            .push_back((Instant::now(), Command::new(id, message_type, payload)));
        id
    }

    pub fn queued_len(&self) -> usize {
        self.outgoing.len()
    }

    /// Write every due queued command to the transport as one burst
    pub fn flush(&mut self) -> Result<(), ClientError> {
        let now = Instant::now();
        let mut burst = Vec::new();
        while let Some((queued_at, _)) = self.outgoing.front() {
            if let Some(delay) = self.command_delay {
                if now.duration_since(*queued_at) < delay {
                    break;
                }
            }
            let Some((_, command)) = self.outgoing.pop_front() else {
                break;
            };
            trace!("sending command {} ({:?})", command.id, command.message_type);
            let wrapped = Command::new(
                command.id,
                MessageType::ClientIdWrapper,
                encode_wrapped(&self.client_id, command.message_type, &command.payload),
            );
            burst.extend_from_slice(&wrapped.to_frame());
        }
        if !burst.is_empty() {
            self.transport.send(&burst)?;
        }
        Ok(())
    }

    /// Drain the socket and return every complete command received.
    ///
    /// Framing corruption is fatal: the error tears the connection down.
    pub fn receive(&mut self) -> Result<Vec<Command>, ClientError> {
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        while let Some(count) = self.transport.receive(&mut chunk)? {
            self.codec.feed(&chunk[..count]);
        }

        let mut commands = Vec::new();
        loop {
            match self.codec.next_command() {
                Ok(Some(command)) => {
                    debug!(
                        "received command {} ({:?}, {} bytes)",
                        command.id,
                        command.message_type,
                        command.payload.len()
                    );
                    commands.push(command);
                }
                Ok(None) => break,
                Err(err) => {
                    return Err(ClientError::ConnectionLost {
                        reason: err.to_string(),
                    })
                }
            }
        }
        Ok(commands)
    }
}
