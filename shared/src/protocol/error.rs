use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The protocol is locked and cannot be modified
    #[error("SyncProtocol is already locked and cannot be modified. lock() has been called and no further changes are allowed")]
    AlreadyLocked,
}
