mod tcp;

pub use tcp::TcpTransport;

use std::io;

/// Byte stream the connection pumps every tick.
///
/// `receive` must never block: the session is single-threaded and polls
/// the transport between diff passes. `send` may block, bounded by the
/// transport's own write timeout.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available right now into `buffer`. `Ok(None)`
    /// means nothing is pending; `Ok(Some(0))` never occurs, a closed
    /// peer is an error.
    fn receive(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>>;
}
