//! The protocol every integration test speaks, plus a two-session harness.

use meld_client::{SessionEvent, SyncSession};
use meld_shared::{
    BulkSpec, GraphRegistry, SoaFieldSpec, SyncProtocol, TypeCode, TypeSpec,
};

use crate::local_wire::LocalWire;

/// Objects with a denied cache field, meshes with a bulk vertex buffer
pub fn protocol() -> SyncProtocol {
    let mut protocol = SyncProtocol::builder();
    protocol
        .add_collection("objects")
        .add_collection("meshes")
        .add_type(TypeSpec::new("Object").deny(&["runtime_cache"]))
        .add_type(
            TypeSpec::new("Mesh")
                .order_first(&["element_kind"])
                .bulk_field(
                    "vertices",
                    BulkSpec {
                        soa_fields: vec![SoaFieldSpec::vector("co", TypeCode::F32, 3)],
                        aos_fields: vec!["select".to_string()],
                    },
                ),
        );
    protocol.build()
}

/// Two joined sessions wired back to back, each with its own live graph
pub struct SyncPair {
    pub wire: LocalWire,
    pub session_a: SyncSession,
    pub session_b: SyncSession,
    pub registry_a: GraphRegistry,
    pub registry_b: GraphRegistry,
}

impl SyncPair {
    pub fn new() -> Self {
        let wire = LocalWire::new();
        let mut session_a = SyncSession::new(protocol());
        let mut session_b = SyncSession::new(protocol());
        session_a.connect(wire.endpoint_a()).unwrap();
        session_b.connect(wire.endpoint_b()).unwrap();
        session_a.join_room("test-room").unwrap();
        session_b.join_room("test-room").unwrap();
        Self {
            wire,
            session_a,
            session_b,
            registry_a: GraphRegistry::new(),
            registry_b: GraphRegistry::new(),
        }
    }

    /// Tick A so its local changes go out, then tick B; returns B's events
    pub fn sync_a_to_b(&mut self) -> Vec<SessionEvent> {
        self.session_a.tick(&mut self.registry_a).unwrap();
        self.session_b.tick(&mut self.registry_b).unwrap()
    }

    pub fn sync_b_to_a(&mut self) -> Vec<SessionEvent> {
        self.session_b.tick(&mut self.registry_b).unwrap();
        self.session_a.tick(&mut self.registry_a).unwrap()
    }
}

impl Default for SyncPair {
    fn default() -> Self {
        Self::new()
    }
}
