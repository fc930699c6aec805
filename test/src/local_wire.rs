//! In-memory transport pair for end-to-end testing.
//! Routes byte bursts between two sessions without network I/O.

use std::collections::VecDeque;
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use meld_client::Transport;

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// A bidirectional in-memory wire. Hand one endpoint to each session;
/// keep the wire itself around to inject raw bytes or sever the link.
#[derive(Clone, Default)]
pub struct LocalWire {
    a_to_b: Queue,
    b_to_a: Queue,
    severed: Arc<AtomicBool>,
}

impl LocalWire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint_a(&self) -> Box<dyn Transport> {
        Box::new(LocalTransport {
            outgoing: self.a_to_b.clone(),
            incoming: self.b_to_a.clone(),
            severed: self.severed.clone(),
        })
    }

    pub fn endpoint_b(&self) -> Box<dyn Transport> {
        Box::new(LocalTransport {
            outgoing: self.b_to_a.clone(),
            incoming: self.a_to_b.clone(),
            severed: self.severed.clone(),
        })
    }

    /// A transport whose sends come straight back to it, like a relay
    /// echoing a client's own commands
    pub fn loopback() -> Box<dyn Transport> {
        let queue: Queue = Arc::default();
        Box::new(LocalTransport {
            outgoing: queue.clone(),
            incoming: queue,
            severed: Arc::default(),
        })
    }

    /// Push raw bytes toward endpoint B, bypassing any session
    pub fn inject_toward_b(&self, bytes: &[u8]) {
        self.a_to_b.lock().unwrap().push_back(bytes.to_vec());
    }

    pub fn pending_toward_b(&self) -> usize {
        self.a_to_b.lock().unwrap().iter().map(Vec::len).sum()
    }

    pub fn pending_toward_a(&self) -> usize {
        self.b_to_a.lock().unwrap().iter().map(Vec::len).sum()
    }

    /// Simulate the peer going away; both endpoints start erroring
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
    }
}

struct LocalTransport {
    outgoing: Queue,
    incoming: Queue,
    severed: Arc<AtomicBool>,
}

impl Transport for LocalTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire severed"));
        }
        self.outgoing.lock().unwrap().push_back(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        if self.severed.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "wire severed",
            ));
        }
        let mut queue = self.incoming.lock().unwrap();
        let Some(mut chunk) = queue.pop_front() else {
            return Ok(None);
        };
        // a burst larger than the read buffer is delivered in pieces
        if chunk.len() > buffer.len() {
            let rest = chunk.split_off(buffer.len());
            queue.push_front(rest);
        }
        buffer[..chunk.len()].copy_from_slice(&chunk);
        Ok(Some(chunk.len()))
    }
}
