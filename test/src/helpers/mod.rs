pub mod test_graph;
pub mod test_protocol;

pub use test_graph::{mesh, object, object_with_parent, vertex};
pub use test_protocol::{protocol, SyncPair};
