//! Integration specifications for the room allocation engine and the
//! room-change workflow.
//!
//! Scenarios run end-to-end through the public service facade and the HTTP
//! router so the invariants (one bed per student, structural capacity, atomic
//! moves) are validated without reaching into private modules.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use hostelry::housing::allocation::{
        AllocationService, ChangeRequestLedger, ChangeRequestWorkflow, LedgerError, NewRoom,
        NoticeError, OccupancyView, RequestId, RequestStatus, ResolutionNotice,
        ResolutionPublisher, RoomChangeRequest, RoomInventory, RoomType, StudentId,
    };
    use hostelry::housing::allocation::{housing_router, HousingState};

    #[derive(Default, Clone)]
    pub struct MemoryLedger {
        requests: Arc<Mutex<HashMap<RequestId, RoomChangeRequest>>>,
    }

    impl ChangeRequestLedger for MemoryLedger {
        fn insert(&self, request: RoomChangeRequest) -> Result<RoomChangeRequest, LedgerError> {
            let mut guard = self.requests.lock().expect("lock");
            if guard.contains_key(&request.id) {
                return Err(LedgerError::Conflict);
            }
            guard.insert(request.id.clone(), request.clone());
            Ok(request)
        }

        fn update(&self, request: RoomChangeRequest) -> Result<(), LedgerError> {
            let mut guard = self.requests.lock().expect("lock");
            if guard.contains_key(&request.id) {
                guard.insert(request.id.clone(), request);
                Ok(())
            } else {
                Err(LedgerError::NotFound)
            }
        }

        fn fetch(&self, id: &RequestId) -> Result<Option<RoomChangeRequest>, LedgerError> {
            let guard = self.requests.lock().expect("lock");
            Ok(guard.get(id).cloned())
        }

        fn pending(&self, limit: usize) -> Result<Vec<RoomChangeRequest>, LedgerError> {
            let guard = self.requests.lock().expect("lock");
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
    pub struct MemoryNotices {
        notices: Arc<Mutex<Vec<ResolutionNotice>>>,
    }

    impl MemoryNotices {
        pub fn notices(&self) -> Vec<ResolutionNotice> {
            self.notices.lock().expect("lock").clone()
        }
    }

    impl ResolutionPublisher for MemoryNotices {
        fn publish(&self, notice: ResolutionNotice) -> Result<(), NoticeError> {
            self.notices.lock().expect("lock").push(notice);
            Ok(())
        }
    }

    pub struct Engine {
        pub inventory: Arc<RoomInventory>,
        pub allocation: Arc<AllocationService>,
        pub workflow: Arc<ChangeRequestWorkflow<MemoryLedger, MemoryNotices>>,
        pub occupancy: Arc<OccupancyView>,
        pub notices: Arc<MemoryNotices>,
    }

    pub fn build_engine() -> Engine {
        let inventory = Arc::new(RoomInventory::new());
        let allocation = Arc::new(AllocationService::new(inventory.clone()));
        let ledger = Arc::new(MemoryLedger::default());
        let notices = Arc::new(MemoryNotices::default());
        let workflow = Arc::new(ChangeRequestWorkflow::new(
            allocation.clone(),
            ledger.clone(),
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

    pub fn engine_router(engine: &Engine) -> axum::Router {
        housing_router(Arc::new(HousingState {
            inventory: engine.inventory.clone(),
            allocation: engine.allocation.clone(),
            workflow: engine.workflow.clone(),
            occupancy: engine.occupancy.clone(),
        }))
    }

    pub fn student(tag: &str) -> StudentId {
        StudentId(format!("stu-{tag}"))
    }

    pub fn room(number: &str, block: &str, room_type: RoomType, capacity: u8) -> NewRoom {
        NewRoom {
            room_number: number.to_string(),
            block: block.to_string(),
            floor: 1,
            room_type,
            capacity,
            price_per_month: 5200,
        }
    }

    /// Every student holds at most one bed and every room carries exactly
    /// `capacity` beds.
    pub fn assert_invariants(engine: &Engine) {
        let rooms = engine.inventory.list_rooms();
        let mut seen = std::collections::HashSet::new();
        for room in &rooms {
            assert_eq!(room.beds.len(), room.capacity as usize);
            for bed in &room.beds {
                if let Some(occupant) = &bed.occupant {
                    assert!(
                        seen.insert(occupant.clone()),
                        "student {occupant} occupies more than one bed"
                    );
                }
            }
        }
    }
}

mod allocation {
    use super::common::*;
    use hostelry::housing::allocation::{AllocationError, RoomStatus, RoomType};

    #[test]
    fn fresh_room_starts_vacant_with_numbered_beds() {
        let engine = build_engine();
        let room = engine
            .inventory
            .create_room(room("A-101", "A-Block", RoomType::Triple, 3))
            .expect("room created");

        assert_eq!(room.beds.len(), 3);
        let numbers: Vec<u8> = room.beds.iter().map(|bed| bed.bed_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(room.status(), RoomStatus::Vacant);
        assert_invariants(&engine);
    }

    #[test]
    fn direct_reallocation_of_housed_student_is_refused() {
        let engine = build_engine();
        let first = engine
            .inventory
            .create_room(room("A-101", "A-Block", RoomType::Triple, 3))
            .expect("room created");
        let second = engine
            .inventory
            .create_room(room("B-201", "B-Block", RoomType::Triple, 3))
            .expect("room created");

        engine
            .allocation
            .allocate(student("x"), &first.id, 2)
            .expect("allocation succeeds");
        let status = engine.occupancy.room_status(&first.id).expect("status");
        assert_eq!(status.occupied_count, 1);
        assert_eq!(status.status, RoomStatus::Partial);

        let result = engine.allocation.allocate(student("x"), &second.id, 1);
        assert!(matches!(
            result,
            Err(AllocationError::StudentAlreadyAllocated { .. })
        ));
        assert_invariants(&engine);

        let untouched = engine.occupancy.room_status(&second.id).expect("status");
        assert_eq!(untouched.status, RoomStatus::Vacant);
    }
}

mod moves {
    use super::common::*;
    use hostelry::housing::allocation::{
        AllocationError, RequestStatus, ResolutionAction, RoomType, WorkflowError,
    };

    #[test]
    fn approved_request_relocates_the_student() {
        let engine = build_engine();
        let from = engine
            .inventory
            .create_room(room("A-101", "A-Block", RoomType::Triple, 3))
            .expect("room created");
        let to = engine
            .inventory
            .create_room(room("B-201", "B-Block", RoomType::Triple, 3))
            .expect("room created");
        engine
            .allocation
            .allocate(student("x"), &from.id, 2)
            .expect("allocation succeeds");

        let request = engine
            .workflow
            .apply(
                student("x"),
                to.id.clone(),
                None,
                "closer to library".to_string(),
            )
            .expect("request filed");
        let resolved = engine
            .workflow
            .resolve(&request.id, ResolutionAction::Approve, Some("ok".to_string()))
            .expect("approval succeeds");

        assert_eq!(resolved.status, RequestStatus::Approved);
        let old = engine.inventory.get_room(&from.id).expect("room fetched");
        assert!(old.bed(2).expect("bed exists").occupant.is_none());
        let new = engine.inventory.get_room(&to.id).expect("room fetched");
        assert_eq!(
            new.bed(1).and_then(|bed| bed.occupant.clone()),
            Some(student("x"))
        );
        assert_invariants(&engine);
        assert_eq!(engine.notices.notices().len(), 1);
    }

    #[test]
    fn losing_request_stays_pending_for_retry() {
        let engine = build_engine();
        let from = engine
            .inventory
            .create_room(room("A-101", "A-Block", RoomType::Triple, 3))
            .expect("room created");
        let to = engine
            .inventory
            .create_room(room("S-001", "B-Block", RoomType::Single, 1))
            .expect("room created");
        engine
            .allocation
            .allocate(student("x"), &from.id, 1)
            .expect("allocation succeeds");
        engine
            .allocation
            .allocate(student("y"), &from.id, 2)
            .expect("allocation succeeds");

        let winner = engine
            .workflow
            .apply(student("x"), to.id.clone(), None, "quiet".to_string())
            .expect("request filed");
        let loser = engine
            .workflow
            .apply(student("y"), to.id.clone(), None, "quiet".to_string())
            .expect("request filed");

        engine
            .workflow
            .resolve(&winner.id, ResolutionAction::Approve, None)
            .expect("first approval succeeds");
        let result = engine
            .workflow
            .resolve(&loser.id, ResolutionAction::Approve, None);
        assert!(matches!(
            result,
            Err(WorkflowError::Allocation(
                AllocationError::NoVacancyAvailable { .. }
            ))
        ));

        let stored = engine.workflow.get(&loser.id).expect("request fetched");
        assert_eq!(stored.status, RequestStatus::Pending);
        assert_invariants(&engine);

        // The warden can still reject the stranded request explicitly.
        let rejected = engine
            .workflow
            .resolve(
                &loser.id,
                ResolutionAction::Reject,
                Some("no seats left this term".to_string()),
            )
            .expect("rejection succeeds");
        assert_eq!(rejected.status, RequestStatus::Rejected);
    }

    #[test]
    fn terminal_requests_never_mutate_again() {
        let engine = build_engine();
        let from = engine
            .inventory
            .create_room(room("A-101", "A-Block", RoomType::Double, 2))
            .expect("room created");
        let to = engine
            .inventory
            .create_room(room("B-201", "B-Block", RoomType::Double, 2))
            .expect("room created");
        engine
            .allocation
            .allocate(student("x"), &from.id, 1)
            .expect("allocation succeeds");
        let request = engine
            .workflow
            .apply(student("x"), to.id, None, "move".to_string())
            .expect("request filed");

        engine
            .workflow
            .resolve(&request.id, ResolutionAction::Approve, Some("ok".to_string()))
            .expect("approval succeeds");
        let result = engine.workflow.resolve(
            &request.id,
            ResolutionAction::Reject,
            Some("x".to_string()),
        );
        assert!(matches!(
            result,
            Err(WorkflowError::RequestAlreadyResolved(_))
        ));

        let stored = engine.workflow.get(&request.id).expect("request fetched");
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.warden_note.as_deref(), Some("ok"));
        assert_invariants(&engine);
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use hostelry::housing::allocation::RoomType;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn post_json(uri: &str, payload: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(payload).expect("serialize payload"),
            ))
            .expect("request")
    }

    #[tokio::test]
    async fn full_journey_over_http() {
        let engine = build_engine();
        let from = engine
            .inventory
            .create_room(room("A-101", "A-Block", RoomType::Triple, 3))
            .expect("room created");
        let to = engine
            .inventory
            .create_room(room("B-201", "B-Block", RoomType::Triple, 3))
            .expect("room created");
        let router = engine_router(&engine);

        let allocate = json!({
            "student_id": "stu-x",
            "room_id": from.id.0,
            "bed_number": 2,
        });
        let response = router
            .clone()
            .oneshot(post_json("/api/v1/allocations", &allocate))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);

        let apply = json!({
            "student_id": "stu-x",
            "desired_room_id": to.id.0,
            "reason": "closer to library",
        });
        let response = router
            .clone()
            .oneshot(post_json("/api/v1/room-changes", &apply))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let payload = read_json(response).await;
        let request_id = payload
            .get("request_id")
            .and_then(Value::as_str)
            .expect("request id")
            .to_string();

        let resolve = json!({ "action": "approve", "warden_note": "ok" });
        let response = router
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/room-changes/{request_id}/resolution"),
                &resolve,
            ))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/occupancy")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let payload = read_json(response).await;
        assert_eq!(payload.get("occupied_beds"), Some(&json!(1)));
        assert_eq!(payload.get("total_beds"), Some(&json!(6)));
        assert_invariants(&engine);
    }
}
