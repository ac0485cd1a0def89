use crate::infra::{build_engine, HousingEngine};
use clap::Args;
use hostelry::error::AppError;
use hostelry::housing::allocation::{
    NewRoom, ResolutionAction, Room, RoomType, StudentId, WorkflowError,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the room-change portion of the demo.
    #[arg(long)]
    pub(crate) skip_change_requests: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let engine = build_engine();

    println!("Hostel allocation demo");
    let rooms = seed_rooms(&engine)?;
    println!("Seeded {} rooms:", rooms.len());
    for room in &rooms {
        println!(
            "- {} | {} | floor {} | {} | {} beds | {}/month",
            room.room_number,
            room.block,
            room.floor,
            room.room_type.label(),
            room.capacity,
            room.price_per_month
        );
    }

    println!("\nAllocating students");
    let alice = StudentId("stu-alice".to_string());
    let bala = StudentId("stu-bala".to_string());
    let chen = StudentId("stu-chen".to_string());

    engine
        .allocation
        .allocate(alice.clone(), &rooms[0].id, 2)
        .map_err(|err| AppError::Housing(WorkflowError::Allocation(err)))?;
    engine
        .allocation
        .allocate(bala.clone(), &rooms[0].id, 1)
        .map_err(|err| AppError::Housing(WorkflowError::Allocation(err)))?;
    engine
        .allocation
        .allocate(chen.clone(), &rooms[3].id, 1)
        .map_err(|err| AppError::Housing(WorkflowError::Allocation(err)))?;
    println!("- {} -> {} bed 2", alice, rooms[0].room_number);
    println!("- {} -> {} bed 1", bala, rooms[0].room_number);
    println!("- {} -> {} bed 1", chen, rooms[3].room_number);

    // A housed student cannot grab a second bed directly.
    match engine.allocation.allocate(alice.clone(), &rooms[1].id, 1) {
        Err(err) => println!("- direct re-allocation refused: {err}"),
        Ok(_) => println!("- direct re-allocation unexpectedly succeeded"),
    }

    if let Some(hint) = engine.occupancy.suggest_bed(Some("B-Block")) {
        println!(
            "\nAdvisory suggestion (no authority): room {} bed {} ({})",
            hint.room_id, hint.bed_number, hint.reason
        );
    }

    render_occupancy(&engine);

    if args.skip_change_requests {
        return Ok(());
    }

    println!("\nRoom-change workflow");
    let request = engine
        .workflow
        .apply(
            alice.clone(),
            rooms[2].id.clone(),
            None,
            "closer to the library".to_string(),
        )
        .map_err(AppError::Housing)?;
    println!(
        "- {} filed request {} for room {}",
        alice, request.id, rooms[2].room_number
    );

    let resolved = engine
        .workflow
        .resolve(
            &request.id,
            ResolutionAction::Approve,
            Some("approved for the new term".to_string()),
        )
        .map_err(AppError::Housing)?;
    println!("- warden approved: status {}", resolved.status.label());
    if let Some(address) = engine.allocation.find_bed(&alice) {
        println!("- {} now sleeps in room {} bed {}", alice, address.room_id, address.bed_number);
    }

    // The single room is now full; a second request for it strands pending.
    let stranded = engine
        .workflow
        .apply(
            bala.clone(),
            rooms[2].id.clone(),
            None,
            "same wing as friends".to_string(),
        )
        .map_err(AppError::Housing)?;
    match engine
        .workflow
        .resolve(&stranded.id, ResolutionAction::Approve, None)
    {
        Err(err) => println!("- second approval failed, request stays pending: {err}"),
        Ok(_) => println!("- second approval unexpectedly succeeded"),
    }
    let still_open = engine.workflow.pending(10).map_err(AppError::Housing)?;
    println!("- pending requests after the race: {}", still_open.len());

    match engine
        .workflow
        .resolve(&request.id, ResolutionAction::Reject, Some("x".to_string()))
    {
        Err(err) => println!("- re-resolving the approved request is refused: {err}"),
        Ok(_) => println!("- re-resolution unexpectedly succeeded"),
    }

    render_occupancy(&engine);

    let notices = engine.notices.notices();
    if notices.is_empty() {
        println!("\nResolution notices: none dispatched");
    } else {
        println!("\nResolution notices");
        for notice in notices {
            println!(
                "- template={} request={} status={}",
                notice.template,
                notice.request_id,
                notice
                    .details
                    .get("status")
                    .map(String::as_str)
                    .unwrap_or("unknown")
            );
        }
    }

    Ok(())
}

fn seed_rooms(engine: &HousingEngine) -> Result<Vec<Room>, AppError> {
    let specs = [
        ("A-101", "A-Block", 1, RoomType::Triple, 3, 4200),
        ("A-102", "A-Block", 1, RoomType::Double, 2, 5100),
        ("B-201", "B-Block", 2, RoomType::Single, 1, 6800),
        ("B-202", "B-Block", 2, RoomType::Triple, 3, 4200),
    ];

    let mut rooms = Vec::with_capacity(specs.len());
    for (number, block, floor, room_type, capacity, price) in specs {
        let room = engine
            .inventory
            .create_room(NewRoom {
                room_number: number.to_string(),
                block: block.to_string(),
                floor,
                room_type,
                capacity,
                price_per_month: price,
            })
            .map_err(|err| AppError::Housing(WorkflowError::Allocation(err.into())))?;
        rooms.push(room);
    }
    Ok(rooms)
}

fn render_occupancy(engine: &HousingEngine) {
    let summary = engine.occupancy.summary();
    println!(
        "\nOccupancy: {}/{} beds across {} rooms ({:.0}%)",
        summary.occupied_beds,
        summary.total_beds,
        summary.total_rooms,
        summary.occupancy_rate * 100.0
    );
    for view in &summary.rooms {
        println!(
            "- {}: {}/{} ({})",
            view.room_number,
            view.occupied_count,
            view.capacity,
            view.status.label()
        );
    }
}
