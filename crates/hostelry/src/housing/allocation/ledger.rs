use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{RequestId, RoomChangeRequest};

/// Storage abstraction for the request ledger so the workflow can be
/// exercised in isolation.
pub trait ChangeRequestLedger: Send + Sync {
    fn insert(&self, request: RoomChangeRequest) -> Result<RoomChangeRequest, LedgerError>;
    fn update(&self, request: RoomChangeRequest) -> Result<(), LedgerError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<RoomChangeRequest>, LedgerError>;
    fn pending(&self, limit: usize) -> Result<Vec<RoomChangeRequest>, LedgerError>;
}

/// Error enumeration for ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("request already exists")]
    Conflict,
    #[error("request not found")]
    NotFound,
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing outbound notification hooks (e.g., mail or push
/// adapters) fed with resolved-request facts.
pub trait ResolutionPublisher: Send + Sync {
    fn publish(&self, notice: ResolutionNotice) -> Result<(), NoticeError>;
}

/// Payload handed to the notification layer when a request reaches a terminal
/// state. Delivery and rendering belong to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionNotice {
    pub template: String,
    pub request_id: RequestId,
    pub details: BTreeMap<String, String>,
}

/// Notice dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
