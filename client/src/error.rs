use thiserror::Error;

use meld_shared::SyncError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Framing corruption or a dead socket. The connection is gone; the
    /// session drops to `Disconnected` and does not reconnect on its own.
    #[error("connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport {
            message: err.to_string(),
        }
    }
}
