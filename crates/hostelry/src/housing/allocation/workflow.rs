use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{RequestId, RequestStatus, RoomChangeRequest, RoomId, StudentId};
use super::ledger::{
    ChangeRequestLedger, LedgerError, NoticeError, ResolutionNotice, ResolutionPublisher,
};
use super::service::{AllocationError, AllocationService};

/// Warden decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Approve,
    Reject,
}

/// Service owning the room-change ledger and the approval move.
pub struct ChangeRequestWorkflow<L, P> {
    allocation: Arc<AllocationService>,
    ledger: Arc<L>,
    notices: Arc<P>,
    resolution_gate: Mutex<()>,
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("rcr-{id:06}"))
}

/// Error raised by the change-request workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("student {0} does not currently occupy a bed")]
    StudentHasNoCurrentRoom(StudentId),
    #[error("request {0} not found")]
    RequestNotFound(RequestId),
    #[error("request {0} is already resolved")]
    RequestAlreadyResolved(RequestId),
    #[error(transparent)]
    Allocation(AllocationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Notice(#[from] NoticeError),
}

impl<L, P> ChangeRequestWorkflow<L, P>
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    pub fn new(allocation: Arc<AllocationService>, ledger: Arc<L>, notices: Arc<P>) -> Self {
        Self {
            allocation,
            ledger,
            notices,
            resolution_gate: Mutex::new(()),
        }
    }

    /// File a pending request for `student_id` to move into
    /// `desired_room_id`. Touches no bed state.
    pub fn apply(
        &self,
        student_id: StudentId,
        desired_room_id: RoomId,
        desired_bed_number: Option<u8>,
        reason: String,
    ) -> Result<RoomChangeRequest, WorkflowError> {
        let current = self
            .allocation
            .find_bed(&student_id)
            .ok_or_else(|| WorkflowError::StudentHasNoCurrentRoom(student_id.clone()))?;

        // A dangling desired room would otherwise only surface at approval.
        self.allocation
            .inventory()
            .get_room(&desired_room_id)
            .map_err(|err| WorkflowError::Allocation(err.into()))?;

        let request = RoomChangeRequest {
            id: next_request_id(),
            student_id,
            current_room_id: current.room_id,
            desired_room_id,
            desired_bed_number,
            reason,
            status: RequestStatus::Pending,
            warden_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        };

        Ok(self.ledger.insert(request)?)
    }

    /// Resolve a pending request. Rejection records the note and stops;
    /// approval performs the move as one unit via the allocation service. A
    /// full desired room leaves the request pending so the warden can retry
    /// once vacancy opens, or reject explicitly.
    pub fn resolve(
        &self,
        request_id: &RequestId,
        action: ResolutionAction,
        warden_note: Option<String>,
    ) -> Result<RoomChangeRequest, WorkflowError> {
        // Serializes warden resolutions so the terminal check cannot race a
        // concurrent resolution of the same request.
        let _gate = self.resolution_gate.lock().expect("resolution gate poisoned");

        let mut request = self
            .ledger
            .fetch(request_id)?
            .ok_or_else(|| WorkflowError::RequestNotFound(request_id.clone()))?;
        if request.status.is_terminal() {
            return Err(WorkflowError::RequestAlreadyResolved(request_id.clone()));
        }

        match action {
            ResolutionAction::Reject => {
                request.status = RequestStatus::Rejected;
            }
            ResolutionAction::Approve => {
                let moved = self.allocation.relocate(
                    &request.student_id,
                    &request.desired_room_id,
                    request.desired_bed_number,
                );
                match moved {
                    Ok(_) => request.status = RequestStatus::Approved,
                    Err(AllocationError::StudentNotAllocated(student_id)) => {
                        return Err(WorkflowError::StudentHasNoCurrentRoom(student_id));
                    }
                    Err(err) => return Err(WorkflowError::Allocation(err)),
                }
            }
        }

        request.warden_note = warden_note;
        request.resolved_at = Some(Utc::now());
        self.ledger.update(request.clone())?;
        self.publish_resolution(&request)?;
        Ok(request)
    }

    /// Fetch a request for API responses.
    pub fn get(&self, request_id: &RequestId) -> Result<RoomChangeRequest, WorkflowError> {
        self.ledger
            .fetch(request_id)?
            .ok_or_else(|| WorkflowError::RequestNotFound(request_id.clone()))
    }

    /// Open requests for warden dashboards.
    pub fn pending(&self, limit: usize) -> Result<Vec<RoomChangeRequest>, WorkflowError> {
        Ok(self.ledger.pending(limit)?)
    }

    fn publish_resolution(&self, request: &RoomChangeRequest) -> Result<(), NoticeError> {
        let mut details = BTreeMap::new();
        details.insert("student_id".to_string(), request.student_id.to_string());
        details.insert("status".to_string(), request.status.label().to_string());
        if let Some(note) = &request.warden_note {
            details.insert("warden_note".to_string(), note.clone());
        }
        self.notices.publish(ResolutionNotice {
            template: "room_change_resolved".to_string(),
            request_id: request.id.clone(),
            details,
        })
    }
}
