pub mod helpers;
pub mod local_wire;

pub use helpers::*;
pub use local_wire::LocalWire;
