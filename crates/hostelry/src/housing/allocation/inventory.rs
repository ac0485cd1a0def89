use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::domain::{Bed, NewRoom, Room, RoomId};

/// Source-of-truth store for room aggregates.
///
/// Every room sits behind its own mutex so bed mutations serialize per room.
/// The outer map is read-mostly: it is only write-locked while a room is being
/// registered.
#[derive(Default)]
pub struct RoomInventory {
    rooms: RwLock<BTreeMap<RoomId, Arc<RoomSlot>>>,
}

pub(crate) struct RoomSlot {
    pub(crate) room_number: String,
    room: Mutex<Room>,
}

impl RoomSlot {
    pub(crate) fn lock_room(&self) -> MutexGuard<'_, Room> {
        self.room.lock().expect("room lock poisoned")
    }
}

static ROOM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_room_id() -> RoomId {
    let id = ROOM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoomId(format!("room-{id:06}"))
}

/// Error enumeration for inventory failures.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("room number {0} is already registered")]
    DuplicateRoomNumber(String),
    #[error("rooms need at least one bed")]
    InvalidCapacity,
    #[error("room {0} not found")]
    RoomNotFound(RoomId),
    #[error("room {room_id} has no bed {bed_number}")]
    BedNotFound { room_id: RoomId, bed_number: u8 },
}

impl RoomInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room with `capacity` vacant beds numbered from 1.
    pub fn create_room(&self, spec: NewRoom) -> Result<Room, InventoryError> {
        if spec.capacity == 0 {
            return Err(InventoryError::InvalidCapacity);
        }

        let mut rooms = self.rooms.write().expect("inventory map poisoned");
        if rooms.values().any(|slot| slot.room_number == spec.room_number) {
            return Err(InventoryError::DuplicateRoomNumber(spec.room_number));
        }

        let beds = (1..=spec.capacity)
            .map(|bed_number| Bed {
                bed_number,
                occupant: None,
            })
            .collect();

        let room = Room {
            id: next_room_id(),
            room_number: spec.room_number,
            block: spec.block,
            floor: spec.floor,
            room_type: spec.room_type,
            capacity: spec.capacity,
            price_per_month: spec.price_per_month,
            beds,
        };

        rooms.insert(
            room.id.clone(),
            Arc::new(RoomSlot {
                room_number: room.room_number.clone(),
                room: Mutex::new(room.clone()),
            }),
        );

        Ok(room)
    }

    /// Point-in-time snapshot of one room.
    pub fn get_room(&self, id: &RoomId) -> Result<Room, InventoryError> {
        let slot = self
            .slot(id)
            .ok_or_else(|| InventoryError::RoomNotFound(id.clone()))?;
        let room = slot.lock_room().clone();
        Ok(room)
    }

    /// Snapshot of every room, in id order. Each room is internally consistent
    /// at the moment it was read.
    pub fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.read().expect("inventory map poisoned");
        rooms.values().map(|slot| slot.lock_room().clone()).collect()
    }

    /// Handle to a room's lock slot, for the allocation service's
    /// check-then-set critical sections.
    pub(crate) fn slot(&self, id: &RoomId) -> Option<Arc<RoomSlot>> {
        let rooms = self.rooms.read().expect("inventory map poisoned");
        rooms.get(id).cloned()
    }
}
