//! Room/bed inventory allocation and room-change request resolution.
//!
//! The inventory holds room aggregates behind per-room locks, the allocation
//! service is the only writer of bed occupancy and guarantees a student holds
//! at most one bed hostel-wide, and the change-request workflow performs the
//! approval move (vacate old bed, occupy new bed) as a single atomic unit.
//! Occupancy projections are recomputed from live state on every read.

pub mod domain;
pub mod inventory;
pub mod ledger;
pub mod occupancy;
pub mod router;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    Bed, BedAddress, NewRoom, RequestId, RequestStatus, RequestView, Room, RoomChangeRequest,
    RoomId, RoomStatus, RoomStatusView, RoomType, StudentId,
};
pub use inventory::{InventoryError, RoomInventory};
pub use ledger::{
    ChangeRequestLedger, LedgerError, NoticeError, ResolutionNotice, ResolutionPublisher,
};
pub use occupancy::{BedSuggestion, OccupancySummary, OccupancyView};
pub use router::{housing_router, HousingState};
pub use service::{AllocationError, AllocationService};
pub use workflow::{ChangeRequestWorkflow, ResolutionAction, WorkflowError};
