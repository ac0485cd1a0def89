use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use hostelry::housing::allocation::{
    AllocationService, ChangeRequestLedger, ChangeRequestWorkflow, HousingState, LedgerError,
    NoticeError, OccupancyView, RequestId, RequestStatus, ResolutionNotice, ResolutionPublisher,
    RoomChangeRequest, RoomInventory,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryChangeRequestLedger {
    requests: Arc<Mutex<HashMap<RequestId, RoomChangeRequest>>>,
}

impl ChangeRequestLedger for InMemoryChangeRequestLedger {
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
pub(crate) struct InMemoryResolutionPublisher {
    notices: Arc<Mutex<Vec<ResolutionNotice>>>,
}

impl ResolutionPublisher for InMemoryResolutionPublisher {
    fn publish(&self, notice: ResolutionNotice) -> Result<(), NoticeError> {
        let mut guard = self.notices.lock().expect("notice mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryResolutionPublisher {
    pub(crate) fn notices(&self) -> Vec<ResolutionNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }
}

pub(crate) struct HousingEngine {
    pub(crate) inventory: Arc<RoomInventory>,
    pub(crate) allocation: Arc<AllocationService>,
    pub(crate) workflow:
        Arc<ChangeRequestWorkflow<InMemoryChangeRequestLedger, InMemoryResolutionPublisher>>,
    pub(crate) occupancy: Arc<OccupancyView>,
    pub(crate) notices: Arc<InMemoryResolutionPublisher>,
}

pub(crate) fn build_engine() -> HousingEngine {
    let inventory = Arc::new(RoomInventory::new());
    let allocation = Arc::new(AllocationService::new(inventory.clone()));
    let ledger = Arc::new(InMemoryChangeRequestLedger::default());
    let notices = Arc::new(InMemoryResolutionPublisher::default());
    let workflow = Arc::new(ChangeRequestWorkflow::new(
        allocation.clone(),
        ledger,
        notices.clone(),
    ));
    let occupancy = Arc::new(OccupancyView::new(inventory.clone()));

    HousingEngine {
        inventory,
        allocation,
        workflow,
        occupancy,
        notices,
    }
}

pub(crate) fn housing_state(
    engine: &HousingEngine,
) -> Arc<HousingState<InMemoryChangeRequestLedger, InMemoryResolutionPublisher>> {
    Arc::new(HousingState {
        inventory: engine.inventory.clone(),
        allocation: engine.allocation.clone(),
        workflow: engine.workflow.clone(),
        occupancy: engine.occupancy.clone(),
    })
}
