use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::housing::allocation::domain::{
    NewRoom, RequestId, RequestStatus, RoomChangeRequest, RoomType, StudentId,
};
use crate::housing::allocation::inventory::RoomInventory;
use crate::housing::allocation::ledger::{
    ChangeRequestLedger, LedgerError, NoticeError, ResolutionNotice, ResolutionPublisher,
};
use crate::housing::allocation::occupancy::OccupancyView;
use crate::housing::allocation::router::{housing_router, HousingState};
use crate::housing::allocation::service::AllocationService;
use crate::housing::allocation::workflow::ChangeRequestWorkflow;

pub(super) fn room_spec(number: &str, block: &str, room_type: RoomType, capacity: u8) -> NewRoom {
    NewRoom {
        room_number: number.to_string(),
        block: block.to_string(),
        floor: 1,
        room_type,
        capacity,
        price_per_month: 4500,
    }
}

pub(super) fn triple(number: &str, block: &str) -> NewRoom {
    room_spec(number, block, RoomType::Triple, 3)
}

pub(super) fn single(number: &str, block: &str) -> NewRoom {
    room_spec(number, block, RoomType::Single, 1)
}

pub(super) fn student(tag: &str) -> StudentId {
    StudentId(format!("stu-{tag}"))
}

#[derive(Default, Clone)]
pub(super) struct MemoryLedger {
    pub(super) requests: Arc<Mutex<HashMap<RequestId, RoomChangeRequest>>>,
}

impl ChangeRequestLedger for MemoryLedger {
    fn insert(&self, request: RoomChangeRequest) -> Result<RoomChangeRequest, LedgerError> {
        let mut guard = self.requests.lock().expect("ledger mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(LedgerError::Conflict);
        }
        guard.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn update(&self, request: RoomChangeRequest) -> Result<(), LedgerError> {
        let mut guard = self.requests.lock().expect("ledger mutex poisoned");
        if guard.contains_key(&request.id) {
            guard.insert(request.id.clone(), request);
            Ok(())
        } else {
            Err(LedgerError::NotFound)
        }
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<RoomChangeRequest>, LedgerError> {
        let guard = self.requests.lock().expect("ledger mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn pending(&self, limit: usize) -> Result<Vec<RoomChangeRequest>, LedgerError> {
        let guard = self.requests.lock().expect("ledger mutex poisoned");
        let mut open: Vec<_> = guard
            .values()
            .filter(|request| request.status == RequestStatus::Pending)
            .cloned()
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)));
        open.truncate(limit);
        Ok(open)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotices {
    notices: Arc<Mutex<Vec<ResolutionNotice>>>,
}

impl MemoryNotices {
    pub(super) fn notices(&self) -> Vec<ResolutionNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }
}

impl ResolutionPublisher for MemoryNotices {
    fn publish(&self, notice: ResolutionNotice) -> Result<(), NoticeError> {
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

/// Ledger double for exercising transport failure paths.
pub(super) struct UnavailableLedger;

impl ChangeRequestLedger for UnavailableLedger {
    fn insert(&self, _request: RoomChangeRequest) -> Result<RoomChangeRequest, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn update(&self, _request: RoomChangeRequest) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<RoomChangeRequest>, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<RoomChangeRequest>, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }
}

pub(super) struct Engine {
    pub(super) inventory: Arc<RoomInventory>,
    pub(super) allocation: Arc<AllocationService>,
    pub(super) workflow: Arc<ChangeRequestWorkflow<MemoryLedger, MemoryNotices>>,
    pub(super) occupancy: Arc<OccupancyView>,
    pub(super) notices: Arc<MemoryNotices>,
}

pub(super) fn build_engine() -> Engine {
    let inventory = Arc::new(RoomInventory::new());
    let allocation = Arc::new(AllocationService::new(inventory.clone()));
    let ledger = Arc::new(MemoryLedger::default());
    let notices = Arc::new(MemoryNotices::default());
    let workflow = Arc::new(ChangeRequestWorkflow::new(
        allocation.clone(),
        ledger,
        notices.clone(),
    ));
    let occupancy = Arc::new(OccupancyView::new(inventory.clone()));

    Engine {
        inventory,
        allocation,
        workflow,
        occupancy,
        notices,
    }
}

pub(super) fn engine_router(engine: &Engine) -> axum::Router {
    housing_router(Arc::new(HousingState {
        inventory: engine.inventory.clone(),
        allocation: engine.allocation.clone(),
        workflow: engine.workflow.clone(),
        occupancy: engine.occupancy.clone(),
    }))
}

/// Count how many beds hostel-wide carry `student` as occupant.
pub(super) fn beds_held_by(engine: &Engine, student: &StudentId) -> usize {
    engine
        .inventory
        .list_rooms()
        .iter()
        .flat_map(|room| room.beds.iter())
        .filter(|bed| bed.occupant.as_ref() == Some(student))
        .count()
}
