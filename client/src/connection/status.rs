/// Where the session currently sits between socket and room.
///
/// The only transitions are forward through `connect`/`join_room` and a
/// drop to `Disconnected` from anywhere; there is no automatic reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    /// Socket is up, no room joined yet
    Connected,
    /// Commands flow both ways
    Joined,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected | ConnectionStatus::Joined)
    }
}
