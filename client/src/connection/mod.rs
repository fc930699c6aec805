mod connection;
mod status;

pub use connection::Connection;
pub use status::ConnectionStatus;
