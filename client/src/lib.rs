//! # Meld Client
//! The synchronization client: a poll-driven session that snapshots a
//! live object graph, exchanges hollow deltas with a relay over a framed
//! byte stream, and keeps both sides converging.

mod attributes;
mod connection;
mod error;
mod events;
mod session;
mod transport;

pub use attributes::{update_and_diff, AttributeDict};
pub use connection::{Connection, ConnectionStatus};
pub use error::ClientError;
pub use events::SessionEvent;
pub use session::SyncSession;
pub use transport::{TcpTransport, Transport};
