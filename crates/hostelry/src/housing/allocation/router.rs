use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{NewRoom, RequestId, RoomId, StudentId};
use super::inventory::{InventoryError, RoomInventory};
use super::ledger::{ChangeRequestLedger, ResolutionPublisher};
use super::occupancy::OccupancyView;
use super::service::{AllocationError, AllocationService};
use super::workflow::{ChangeRequestWorkflow, ResolutionAction, WorkflowError};

/// Shared handles behind the housing endpoints.
pub struct HousingState<L, P> {
    pub inventory: Arc<RoomInventory>,
    pub allocation: Arc<AllocationService>,
    pub workflow: Arc<ChangeRequestWorkflow<L, P>>,
    pub occupancy: Arc<OccupancyView>,
}

/// Router builder exposing the allocation engine over HTTP.
pub fn housing_router<L, P>(state: Arc<HousingState<L, P>>) -> Router
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/rooms",
            post(create_room_handler::<L, P>).get(list_rooms_handler::<L, P>),
        )
        .route("/api/v1/rooms/:room_id", get(get_room_handler::<L, P>))
        .route(
            "/api/v1/rooms/:room_id/status",
            get(room_status_handler::<L, P>),
        )
        .route("/api/v1/allocations", post(allocate_handler::<L, P>))
        .route(
            "/api/v1/rooms/:room_id/beds/:bed_number/occupant",
            delete(vacate_handler::<L, P>),
        )
        .route(
            "/api/v1/students/:student_id/bed",
            get(find_bed_handler::<L, P>),
        )
        .route("/api/v1/room-changes", post(apply_handler::<L, P>))
        .route(
            "/api/v1/room-changes/pending",
            get(pending_handler::<L, P>),
        )
        .route(
            "/api/v1/room-changes/:request_id/resolution",
            post(resolve_handler::<L, P>),
        )
        .route("/api/v1/occupancy", get(occupancy_handler::<L, P>))
        .route(
            "/api/v1/occupancy/suggestion",
            get(suggestion_handler::<L, P>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllocateRequest {
    pub(crate) student_id: String,
    pub(crate) room_id: String,
    pub(crate) bed_number: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomChangeApplyRequest {
    pub(crate) student_id: String,
    pub(crate) desired_room_id: String,
    #[serde(default)]
    pub(crate) desired_bed_number: Option<u8>,
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveRequest {
    pub(crate) action: ResolutionAction,
    #[serde(default)]
    pub(crate) warden_note: Option<String>,
}

fn error_body(status: StatusCode, message: impl ToString) -> Response {
    let payload = json!({ "error": message.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn inventory_error_response(error: InventoryError) -> Response {
    let status = match &error {
        InventoryError::DuplicateRoomNumber(_) => StatusCode::CONFLICT,
        InventoryError::InvalidCapacity => StatusCode::UNPROCESSABLE_ENTITY,
        InventoryError::RoomNotFound(_) | InventoryError::BedNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
    };
    error_body(status, error)
}

fn allocation_error_response(error: AllocationError) -> Response {
    match error {
        AllocationError::Inventory(inner) => inventory_error_response(inner),
        AllocationError::BedOccupiedConflict { .. }
        | AllocationError::StudentAlreadyAllocated { .. }
        | AllocationError::BedAlreadyVacant { .. }
        | AllocationError::NoVacancyAvailable { .. } => error_body(StatusCode::CONFLICT, error),
        AllocationError::StudentNotAllocated(_) => {
            error_body(StatusCode::UNPROCESSABLE_ENTITY, error)
        }
    }
}

fn workflow_error_response(error: WorkflowError) -> Response {
    match error {
        WorkflowError::StudentHasNoCurrentRoom(_) => {
            error_body(StatusCode::UNPROCESSABLE_ENTITY, error)
        }
        WorkflowError::RequestNotFound(_) => error_body(StatusCode::NOT_FOUND, error),
        WorkflowError::RequestAlreadyResolved(_) => error_body(StatusCode::CONFLICT, error),
        WorkflowError::Allocation(inner) => allocation_error_response(inner),
        WorkflowError::Ledger(_) | WorkflowError::Notice(_) => {
            error_body(StatusCode::INTERNAL_SERVER_ERROR, error)
        }
    }
}

pub(crate) async fn create_room_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    axum::Json(spec): axum::Json<NewRoom>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.inventory.create_room(spec) {
        Ok(room) => (StatusCode::CREATED, axum::Json(room)).into_response(),
        Err(error) => inventory_error_response(error),
    }
}

pub(crate) async fn list_rooms_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    (StatusCode::OK, axum::Json(state.inventory.list_rooms())).into_response()
}

pub(crate) async fn get_room_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    Path(room_id): Path<String>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.inventory.get_room(&RoomId(room_id)) {
        Ok(room) => (StatusCode::OK, axum::Json(room)).into_response(),
        Err(error) => inventory_error_response(error),
    }
}

pub(crate) async fn room_status_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    Path(room_id): Path<String>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.occupancy.room_status(&RoomId(room_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => inventory_error_response(error),
    }
}

pub(crate) async fn allocate_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    axum::Json(request): axum::Json<AllocateRequest>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    let student_id = StudentId(request.student_id);
    let room_id = RoomId(request.room_id);
    match state
        .allocation
        .allocate(student_id.clone(), &room_id, request.bed_number)
    {
        Ok(address) => {
            let payload = json!({
                "student_id": student_id,
                "room_id": address.room_id,
                "bed_number": address.bed_number,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn vacate_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    Path((room_id, bed_number)): Path<(String, u8)>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.allocation.vacate(&RoomId(room_id), bed_number) {
        Ok(()) => {
            let payload = json!({ "status": "vacated" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn find_bed_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    Path(student_id): Path<String>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    let student_id = StudentId(student_id);
    match state.allocation.find_bed(&student_id) {
        Some(address) => (StatusCode::OK, axum::Json(address)).into_response(),
        None => error_body(
            StatusCode::NOT_FOUND,
            format!("student {student_id} does not currently occupy a bed"),
        ),
    }
}

pub(crate) async fn apply_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    axum::Json(request): axum::Json<RoomChangeApplyRequest>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.workflow.apply(
        StudentId(request.student_id),
        RoomId(request.desired_room_id),
        request.desired_bed_number,
        request.reason,
    ) {
        Ok(created) => (StatusCode::ACCEPTED, axum::Json(created.status_view())).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn pending_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.workflow.pending(100) {
        Ok(requests) => {
            let views: Vec<_> = requests
                .iter()
                .map(|request| request.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn resolve_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
    Path(request_id): Path<String>,
    axum::Json(request): axum::Json<ResolveRequest>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.workflow.resolve(
        &RequestId(request_id),
        request.action,
        request.warden_note,
    ) {
        Ok(resolved) => (StatusCode::OK, axum::Json(resolved.status_view())).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn occupancy_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    (StatusCode::OK, axum::Json(state.occupancy.summary())).into_response()
}

pub(crate) async fn suggestion_handler<L, P>(
    State(state): State<Arc<HousingState<L, P>>>,
) -> Response
where
    L: ChangeRequestLedger + 'static,
    P: ResolutionPublisher + 'static,
{
    match state.occupancy.suggest_bed(None) {
        Some(suggestion) => (StatusCode::OK, axum::Json(suggestion)).into_response(),
        None => error_body(StatusCode::NOT_FOUND, "no vacant beds available"),
    }
}
