use std::{collections::HashSet, mem};

use log::{debug, warn};

use meld_shared::{
    decode_attributes, decode_create, decode_media, decode_remove, decode_rename, decode_update,
    decode_wrapped, encode_attributes, encode_create, encode_media, encode_remove, encode_rename,
    encode_update, navigate_mut, Command, CreatePayload, DatablockProxies, DatablockProxy,
    EntityUuid, GraphDiffer, GraphRegistry, LiveValue, MessageType, PendingRef, ProxyContext,
    RenameEvent, SaveContext, SyncError, SyncProtocol, UnresolvedRefs, UpdatePayload,
};

use crate::{
    attributes::{update_and_diff, AttributeDict},
    connection::{Connection, ConnectionStatus},
    error::ClientError,
    events::SessionEvent,
    transport::Transport,
};

/// One client's whole synchronization state: snapshots, parked references,
/// presence dictionaries and the wire connection.
///
/// Single-threaded and poll-driven. Each [`SyncSession::tick`] drains and
/// applies incoming commands, diffs the live graph against the held
/// snapshots, and flushes everything queued as one burst. The only
/// blocking points are inside the transport.
pub struct SyncSession {
    protocol: SyncProtocol,
    /// Identity stamped on every outgoing command; incoming commands
    /// carrying it are relay echoes of our own work
    client_id: String,
    differ: GraphDiffer,
    proxies: DatablockProxies,
    unresolved: UnresolvedRefs,
    connection: Option<Connection>,
    status: ConnectionStatus,
    room: Option<String>,
    client_attributes: AttributeDict,
    room_attributes: AttributeDict,
    pending: Vec<SessionEvent>,
}

impl SyncSession {
    /// Locks the protocol if the caller has not already
    pub fn new(mut protocol: SyncProtocol) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }
        let differ = GraphDiffer::new(protocol.collision_policy);
        Self {
            protocol,
            client_id: EntityUuid::generate().to_string(),
            differ,
            proxies: DatablockProxies::new(),
            unresolved: UnresolvedRefs::new(),
            connection: None,
            status: ConnectionStatus::Disconnected,
            room: None,
            client_attributes: AttributeDict::new(),
            room_attributes: AttributeDict::new(),
            pending: Vec::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn client_attributes(&self) -> &AttributeDict {
        &self.client_attributes
    }

    pub fn room_attributes(&self) -> &AttributeDict {
        &self.room_attributes
    }

    pub fn connect(&mut self, transport: Box<dyn Transport>) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Err(ClientError::AlreadyConnected);
        }
        self.status = ConnectionStatus::Connecting;
        self.connection = Some(Connection::new(
            transport,
            self.client_id.clone(),
            self.protocol.command_delay,
        ));
        self.set_status(ConnectionStatus::Connected);
        Ok(())
    }

    pub fn join_room(&mut self, room: impl Into<String>) -> Result<(), ClientError> {
        if self.connection.is_none() {
            return Err(ClientError::NotConnected);
        }
        self.room = Some(room.into());
        self.set_status(ConnectionStatus::Joined);
        Ok(())
    }

    pub fn leave_room(&mut self) {
        if self.room.take().is_some() {
            self.set_status(ConnectionStatus::Connected);
        }
    }

    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            self.room = None;
            self.set_status(ConnectionStatus::Disconnected);
        }
    }

    /// One cooperative synchronization step.
    ///
    /// A socket or framing failure drops the connection and returns
    /// [`ClientError::ConnectionLost`]; the matching status-change event
    /// is delivered by the next call.
    pub fn tick(&mut self, registry: &mut GraphRegistry) -> Result<Vec<SessionEvent>, ClientError> {
        let mut events = mem::take(&mut self.pending);
        let Some(mut connection) = self.connection.take() else {
            return Ok(events);
        };

        let commands = match connection.receive() {
            Ok(commands) => commands,
            Err(err) => {
                self.pending = events;
                return Err(self.drop_connection(err));
            }
        };
        for command in commands {
            self.process_command(&mut connection, registry, command, &mut events);
        }

        if self.status == ConnectionStatus::Joined {
            self.scan_local_changes(&mut connection, registry, &mut events);
        }

        if let Err(err) = connection.flush() {
            self.pending = events;
            return Err(self.drop_connection(err));
        }

        self.connection = Some(connection);
        Ok(events)
    }

    /// Register a new entity locally, renaming it if its name is taken.
    ///
    /// Used for incoming creates and for programmatic local registration;
    /// the next tick's scan sees snapshot and live graph already agreeing
    /// and sends nothing.
    pub fn create_entity(
        &mut self,
        registry: &mut GraphRegistry,
        collection: &str,
        mut datablock: DatablockProxy,
    ) -> Result<(EntityUuid, Vec<RenameEvent>), ClientError> {
        let uuid = datablock.uuid;
        if registry.contains(uuid) {
            return Err(SyncError::IdentityConflict { uuid }.into());
        }

        let mut renames = Vec::new();
        let unique = unique_name(registry, collection, &datablock.name);
        if unique != datablock.name {
            renames.push(RenameEvent {
                uuid,
                old_name: datablock.name.clone(),
                new_name: unique.clone(),
            });
            datablock.name = unique;
        }

        let mut save = SaveContext::new();
        let live = datablock.materialize(&mut save)?;
        registry.insert(collection, live);
        self.proxies.insert(collection, datablock);
        self.settle_references(registry, uuid, save);
        self.unresolved.resolve(uuid, registry);
        Ok((uuid, renames))
    }

    /// Apply an entity delta to the live graph and the held snapshot
    pub fn update_entity(
        &mut self,
        registry: &mut GraphRegistry,
        payload: &UpdatePayload,
    ) -> Result<(), ClientError> {
        let uuid = payload.uuid;
        let mut save = SaveContext::new();
        {
            let proxy = self
                .proxies
                .find_mut(uuid)
                .ok_or(SyncError::UnknownEntity { uuid })?;
            let live = registry
                .find_mut(uuid)
                .ok_or(SyncError::UnknownEntity { uuid })?;
            proxy.apply(&payload.delta, live, &mut save)?;
        }
        self.settle_references(registry, uuid, save);
        Ok(())
    }

    /// Drop an entity everywhere; returns its last display name
    pub fn remove_entity(
        &mut self,
        registry: &mut GraphRegistry,
        uuid: EntityUuid,
    ) -> Result<String, ClientError> {
        let live = registry
            .remove(uuid)
            .ok_or(SyncError::UnknownEntity { uuid })?;
        self.proxies.remove(uuid);
        self.unresolved.forget_owner(uuid);
        Ok(live.name)
    }

    pub fn rename_entities(&mut self, registry: &mut GraphRegistry, renames: &[RenameEvent]) {
        for rename in renames {
            if !registry.rename(rename.uuid, &rename.new_name) {
                warn!("rename for unknown entity {}", rename.uuid);
                continue;
            }
            if let Some(proxy) = self.proxies.find_mut(rename.uuid) {
                proxy.name = rename.new_name.clone();
            }
        }
    }

    pub fn send_media(&mut self, path: &str, content: &[u8]) -> Result<(), ClientError> {
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        connection.queue(MessageType::BulkMedia, encode_media(path, content));
        Ok(())
    }

    /// Diff the presence dictionary and queue only the changed keys
    pub fn update_client_attributes(&mut self, fresh: &AttributeDict) -> Result<(), ClientError> {
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        if let Some(changed) = update_and_diff(&mut self.client_attributes, fresh) {
            connection.queue(MessageType::ClientUpdate, encode_attributes(&changed)?);
        }
        Ok(())
    }

    pub fn update_room_attributes(&mut self, fresh: &AttributeDict) -> Result<(), ClientError> {
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        if let Some(changed) = update_and_diff(&mut self.room_attributes, fresh) {
            connection.queue(MessageType::RoomUpdate, encode_attributes(&changed)?);
        }
        Ok(())
    }

    // -- incoming ---------------------------------------------------------

    fn process_command(
        &mut self,
        connection: &mut Connection,
        registry: &mut GraphRegistry,
        command: Command,
        events: &mut Vec<SessionEvent>,
    ) {
        let (message_type, payload) = match command.message_type {
            MessageType::ClientIdWrapper => match decode_wrapped(&command.payload) {
                Ok((sender, inner_type, inner_payload)) => {
                    if sender == self.client_id {
                        debug!("command {} round-tripped, skipping", command.id);
                        return;
                    }
                    (inner_type, inner_payload)
                }
                Err(err) => {
                    events.push(SessionEvent::EntityFailed {
                        uuid: None,
                        error: err.to_string(),
                    });
                    return;
                }
            },
            other => (other, command.payload),
        };
        self.dispatch(connection, registry, message_type, &payload, events);
    }

    fn dispatch(
        &mut self,
        connection: &mut Connection,
        registry: &mut GraphRegistry,
        message_type: MessageType,
        payload: &[u8],
        events: &mut Vec<SessionEvent>,
    ) {
        match message_type {
            MessageType::ClientIdWrapper => warn!("nested sender wrapper dropped"),
            MessageType::EntityCreate => self.apply_create(connection, registry, payload, events),
            MessageType::EntityUpdate => self.apply_update(registry, payload, events),
            MessageType::EntityRemove => self.apply_remove(registry, payload, events),
            MessageType::EntityRename => self.apply_rename(registry, payload, events),
            MessageType::BulkMedia => match decode_media(payload) {
                Ok((path, content)) => events.push(SessionEvent::MediaReceived { path, content }),
                Err(err) => events.push(SessionEvent::EntityFailed {
                    uuid: None,
                    error: err.to_string(),
                }),
            },
            MessageType::ClientUpdate => match decode_attributes(payload) {
                Ok(fresh) => {
                    if let Some(changed) = update_and_diff(&mut self.client_attributes, &fresh) {
                        events.push(SessionEvent::ClientAttributesChanged { changed });
                    }
                }
                Err(err) => warn!("malformed client attribute update dropped: {err}"),
            },
            MessageType::RoomUpdate => match decode_attributes(payload) {
                Ok(fresh) => {
                    if let Some(changed) = update_and_diff(&mut self.room_attributes, &fresh) {
                        events.push(SessionEvent::RoomAttributesChanged { changed });
                    }
                }
                Err(err) => warn!("malformed room attribute update dropped: {err}"),
            },
        }
    }

    fn apply_create(
        &mut self,
        connection: &mut Connection,
        registry: &mut GraphRegistry,
        bytes: &[u8],
        events: &mut Vec<SessionEvent>,
    ) {
        let payload = match decode_create(bytes) {
            Ok(payload) => payload,
            Err(err) => {
                events.push(SessionEvent::EntityFailed {
                    uuid: None,
                    error: err.to_string(),
                });
                return;
            }
        };
        let collection = payload.collection.clone();
        match self.create_entity(registry, &collection, payload.datablock) {
            Ok((uuid, renames)) => {
                events.push(SessionEvent::EntityCreated { collection, uuid });
                if !renames.is_empty() {
                    // tell the peers which name the entity ended up with
                    connection.queue(MessageType::EntityRename, encode_rename(&renames));
                    for rename in renames {
                        events.push(SessionEvent::EntityRenamed {
                            uuid: rename.uuid,
                            old_name: rename.old_name,
                            new_name: rename.new_name,
                        });
                    }
                }
            }
            Err(err) => events.push(SessionEvent::EntityFailed {
                uuid: None,
                error: err.to_string(),
            }),
        }
    }

    fn apply_update(
        &mut self,
        registry: &mut GraphRegistry,
        bytes: &[u8],
        events: &mut Vec<SessionEvent>,
    ) {
        let payload = match decode_update(bytes) {
            Ok(payload) => payload,
            Err(err) => {
                events.push(SessionEvent::EntityFailed {
                    uuid: None,
                    error: err.to_string(),
                });
                return;
            }
        };
        match self.update_entity(registry, &payload) {
            Ok(()) => events.push(SessionEvent::EntityUpdated { uuid: payload.uuid }),
            Err(err) => events.push(SessionEvent::EntityFailed {
                uuid: Some(payload.uuid),
                error: err.to_string(),
            }),
        }
    }

    fn apply_remove(
        &mut self,
        registry: &mut GraphRegistry,
        bytes: &[u8],
        events: &mut Vec<SessionEvent>,
    ) {
        let (uuid, display_name) = match decode_remove(bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                events.push(SessionEvent::EntityFailed {
                    uuid: None,
                    error: err.to_string(),
                });
                return;
            }
        };
        match self.remove_entity(registry, uuid) {
            Ok(name) => {
                debug!("removed {name} ({display_name})");
                events.push(SessionEvent::EntityRemoved { uuid, display_name });
            }
            Err(err) => events.push(SessionEvent::EntityFailed {
                uuid: Some(uuid),
                error: err.to_string(),
            }),
        }
    }

    fn apply_rename(
        &mut self,
        registry: &mut GraphRegistry,
        bytes: &[u8],
        events: &mut Vec<SessionEvent>,
    ) {
        let renames = match decode_rename(bytes) {
            Ok(renames) => renames,
            Err(err) => {
                events.push(SessionEvent::EntityFailed {
                    uuid: None,
                    error: err.to_string(),
                });
                return;
            }
        };
        self.rename_entities(registry, &renames);
        for rename in renames {
            events.push(SessionEvent::EntityRenamed {
                uuid: rename.uuid,
                old_name: rename.old_name,
                new_name: rename.new_name,
            });
        }
    }

    // -- outgoing ---------------------------------------------------------

    /// Diff pass: identities first, then per-entity recursive diffs.
    /// One entity failing to snapshot or diff never blocks its siblings.
    fn scan_local_changes(
        &mut self,
        connection: &mut Connection,
        registry: &mut GraphRegistry,
        events: &mut Vec<SessionEvent>,
    ) {
        for name in &self.protocol.collections {
            registry.add_collection(name.clone());
        }
        let changes = self.differ.compute(registry, &self.proxies);

        if !changes.renamed.is_empty() {
            connection.queue(MessageType::EntityRename, encode_rename(&changes.renamed));
            self.rename_entities(registry, &changes.renamed);
        }

        for (_, uuid) in &changes.removed {
            // the live entity is already gone; the snapshot still knows
            // its last name
            if let Some((_, proxy)) = self.proxies.find(*uuid) {
                connection.queue(MessageType::EntityRemove, encode_remove(*uuid, &proxy.name));
            }
            self.proxies.remove(*uuid);
            self.unresolved.forget_owner(*uuid);
        }

        let ctx = ProxyContext::new(self.protocol.filter());
        let mut batch = Vec::new();
        for (collection, uuid) in &changes.added {
            let Some((_, live)) = registry.find(*uuid) else {
                continue;
            };
            match DatablockProxy::load(live, &ctx) {
                Ok(proxy) => batch.push((collection.clone(), proxy)),
                Err(err) => events.push(SessionEvent::EntityFailed {
                    uuid: Some(*uuid),
                    error: err.to_string(),
                }),
            }
        }
        for (collection, proxy) in order_creates(batch) {
            let uuid = proxy.uuid;
            let payload = CreatePayload {
                collection: collection.clone(),
                datablock: proxy,
            };
            match encode_create(&payload) {
                Ok(bytes) => {
                    connection.queue(MessageType::EntityCreate, bytes);
                    self.proxies.insert(&collection, payload.datablock);
                }
                Err(err) => events.push(SessionEvent::EntityFailed {
                    uuid: Some(uuid),
                    error: err.to_string(),
                }),
            }
        }

        for uuid in self.proxies.uuids() {
            // entities with parked reference slots are incompletely
            // applied; diffing them would echo the placeholder
            if self.unresolved.owner_pending(uuid) {
                continue;
            }
            let Some((_, live)) = registry.find(uuid) else {
                continue;
            };
            let Some((_, proxy)) = self.proxies.find(uuid) else {
                continue;
            };
            match proxy.diff(live, &ctx) {
                Ok(Some(delta)) => {
                    let payload = UpdatePayload { uuid, delta };
                    match encode_update(&payload) {
                        Ok(bytes) => {
                            connection.queue(MessageType::EntityUpdate, bytes);
                            if let Some(proxy) = self.proxies.find_mut(uuid) {
                                proxy.merge(&payload.delta);
                            }
                        }
                        Err(err) => events.push(SessionEvent::EntityFailed {
                            uuid: Some(uuid),
                            error: err.to_string(),
                        }),
                    }
                }
                Ok(None) => {}
                Err(err) => events.push(SessionEvent::EntityFailed {
                    uuid: Some(uuid),
                    error: err.to_string(),
                }),
            }
        }
    }

    // -- plumbing ---------------------------------------------------------

    /// Patch reference slots whose target already exists; park the rest
    fn settle_references(
        &mut self,
        registry: &mut GraphRegistry,
        owner: EntityUuid,
        mut save: SaveContext,
    ) {
        for candidate in save.take_candidates() {
            if registry.contains(candidate.target) {
                let Some(live) = registry.find_mut(owner) else {
                    continue;
                };
                match navigate_mut(&mut live.root, &candidate.path) {
                    Some(slot) => *slot = LiveValue::Reference(Some(candidate.target)),
                    None => warn!(
                        "reference slot {} vanished from {} before settling",
                        candidate.path, owner
                    ),
                }
            } else {
                self.unresolved.append(
                    candidate.target,
                    PendingRef {
                        datablock: owner,
                        path: candidate.path,
                    },
                );
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        self.pending.push(SessionEvent::StatusChanged { status });
    }

    fn drop_connection(&mut self, err: ClientError) -> ClientError {
        self.room = None;
        self.set_status(ConnectionStatus::Disconnected);
        match err {
            ClientError::ConnectionLost { .. } => err,
            other => ClientError::ConnectionLost {
                reason: other.to_string(),
            },
        }
    }
}

/// Ship referenced targets before their referers so the receiving side
/// parks as few slots as possible; cycles fall back to arrival order
fn order_creates(mut batch: Vec<(String, DatablockProxy)>) -> Vec<(String, DatablockProxy)> {
    let in_batch: HashSet<EntityUuid> = batch.iter().map(|(_, proxy)| proxy.uuid).collect();
    let mut shipped: HashSet<EntityUuid> = HashSet::new();
    let mut ordered = Vec::with_capacity(batch.len());
    while !batch.is_empty() {
        let mut progressed = false;
        let mut index = 0;
        while index < batch.len() {
            let ready = batch[index]
                .1
                .referenced_uuids()
                .iter()
                .all(|target| !in_batch.contains(target) || shipped.contains(target));
            if ready {
                let entry = batch.remove(index);
                shipped.insert(entry.1.uuid);
                ordered.push(entry);
                progressed = true;
            } else {
                index += 1;
            }
        }
        if !progressed {
            ordered.append(&mut batch);
        }
    }
    ordered
}

fn unique_name(registry: &GraphRegistry, collection: &str, name: &str) -> String {
    if !registry.name_taken(collection, name) {
        return name.to_string();
    }
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{name}.{suffix:03}");
        if !registry.name_taken(collection, &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
