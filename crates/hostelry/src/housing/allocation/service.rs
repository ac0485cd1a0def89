use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{BedAddress, Room, RoomId, StudentId};
use super::inventory::{InventoryError, RoomInventory, RoomSlot};

/// The only writer of bed occupancy.
///
/// Room locks serialize mutations per room; the occupancy index is the
/// cross-room record enforcing one bed per student. The index lock is only
/// taken while the involved room lock(s) are held, so the acquisition order is
/// always rooms (ascending id) then index, and every check happens before any
/// mutation inside the locked region.
pub struct AllocationService {
    inventory: Arc<RoomInventory>,
    occupancy: Mutex<HashMap<StudentId, BedAddress>>,
}

/// Error enumeration for allocation failures. All are recoverable caller
/// conditions, never process-fatal.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("bed {bed_number} in room {room_id} is already occupied")]
    BedOccupiedConflict { room_id: RoomId, bed_number: u8 },
    #[error("student {student_id} already occupies bed {} in room {}", .current.bed_number, .current.room_id)]
    StudentAlreadyAllocated {
        student_id: StudentId,
        current: BedAddress,
    },
    #[error("bed {bed_number} in room {room_id} is already vacant")]
    BedAlreadyVacant { room_id: RoomId, bed_number: u8 },
    #[error("student {0} does not currently occupy a bed")]
    StudentNotAllocated(StudentId),
    #[error("no vacant bed available in room {room_id}")]
    NoVacancyAvailable { room_id: RoomId },
}

impl AllocationService {
    pub fn new(inventory: Arc<RoomInventory>) -> Self {
        Self {
            inventory,
            occupancy: Mutex::new(HashMap::new()),
        }
    }

    pub fn inventory(&self) -> &Arc<RoomInventory> {
        &self.inventory
    }

    /// Assign `student_id` to a specific vacant bed. Fails if the bed is taken
    /// or the student already holds a bed anywhere in the hostel; a housed
    /// student moves through the change-request path, never a direct
    /// re-allocation.
    pub fn allocate(
        &self,
        student_id: StudentId,
        room_id: &RoomId,
        bed_number: u8,
    ) -> Result<BedAddress, AllocationError> {
        let slot = self.slot(room_id)?;
        let mut room = slot.lock_room();

        let bed = room
            .bed(bed_number)
            .ok_or_else(|| InventoryError::BedNotFound {
                room_id: room_id.clone(),
                bed_number,
            })?;
        if bed.occupant.is_some() {
            return Err(AllocationError::BedOccupiedConflict {
                room_id: room_id.clone(),
                bed_number,
            });
        }

        let mut occupancy = self.lock_occupancy();
        if let Some(current) = occupancy.get(&student_id) {
            return Err(AllocationError::StudentAlreadyAllocated {
                student_id,
                current: current.clone(),
            });
        }

        room.set_occupant(bed_number, Some(student_id.clone()));
        let address = BedAddress {
            room_id: room_id.clone(),
            bed_number,
        };
        occupancy.insert(student_id, address.clone());
        Ok(address)
    }

    /// Clear an occupied bed.
    pub fn vacate(&self, room_id: &RoomId, bed_number: u8) -> Result<(), AllocationError> {
        let slot = self.slot(room_id)?;
        let mut room = slot.lock_room();

        let bed = room
            .bed(bed_number)
            .ok_or_else(|| InventoryError::BedNotFound {
                room_id: room_id.clone(),
                bed_number,
            })?;
        let Some(student_id) = bed.occupant.clone() else {
            return Err(AllocationError::BedAlreadyVacant {
                room_id: room_id.clone(),
                bed_number,
            });
        };

        let mut occupancy = self.lock_occupancy();
        room.set_occupant(bed_number, None);
        occupancy.remove(&student_id);
        Ok(())
    }

    /// Current bed for a student, if any.
    pub fn find_bed(&self, student_id: &StudentId) -> Option<BedAddress> {
        self.lock_occupancy().get(student_id).cloned()
    }

    /// Move a student into `desired_room_id` as one atomic unit: the old bed
    /// is freed and the new bed occupied, or nothing changes. The target bed
    /// is the named one when given, otherwise the lowest-numbered vacant bed
    /// at the moment the room locks are held.
    pub fn relocate(
        &self,
        student_id: &StudentId,
        desired_room_id: &RoomId,
        desired_bed: Option<u8>,
    ) -> Result<BedAddress, AllocationError> {
        loop {
            let current = self
                .find_bed(student_id)
                .ok_or_else(|| AllocationError::StudentNotAllocated(student_id.clone()))?;

            let desired_slot = self.slot(desired_room_id)?;

            if current.room_id == *desired_room_id {
                let mut room = desired_slot.lock_room();
                let mut occupancy = self.lock_occupancy();
                match occupancy.get(student_id) {
                    Some(address) if *address == current => {}
                    // Assignment moved underneath us; retake the locks against
                    // the fresh address.
                    Some(_) => continue,
                    None => {
                        return Err(AllocationError::StudentNotAllocated(student_id.clone()))
                    }
                }

                let target = resolve_target_bed(&room, desired_bed)?;
                room.set_occupant(current.bed_number, None);
                room.set_occupant(target, Some(student_id.clone()));
                let address = BedAddress {
                    room_id: desired_room_id.clone(),
                    bed_number: target,
                };
                occupancy.insert(student_id.clone(), address.clone());
                return Ok(address);
            }

            let current_slot = self.slot(&current.room_id)?;

            // Two rooms: take the locks in ascending id order.
            let current_first = current.room_id < *desired_room_id;
            let (first, second) = if current_first {
                (&current_slot, &desired_slot)
            } else {
                (&desired_slot, &current_slot)
            };
            let mut first_room = first.lock_room();
            let mut second_room = second.lock_room();
            let (current_room, desired_room) = if current_first {
                (&mut *first_room, &mut *second_room)
            } else {
                (&mut *second_room, &mut *first_room)
            };

            let mut occupancy = self.lock_occupancy();
            match occupancy.get(student_id) {
                Some(address) if *address == current => {}
                Some(_) => continue,
                None => return Err(AllocationError::StudentNotAllocated(student_id.clone())),
            }

            let target = resolve_target_bed(desired_room, desired_bed)?;
            current_room.set_occupant(current.bed_number, None);
            desired_room.set_occupant(target, Some(student_id.clone()));
            let address = BedAddress {
                room_id: desired_room_id.clone(),
                bed_number: target,
            };
            occupancy.insert(student_id.clone(), address.clone());
            return Ok(address);
        }
    }

    fn slot(&self, room_id: &RoomId) -> Result<Arc<RoomSlot>, InventoryError> {
        self.inventory
            .slot(room_id)
            .ok_or_else(|| InventoryError::RoomNotFound(room_id.clone()))
    }

    fn lock_occupancy(&self) -> MutexGuard<'_, HashMap<StudentId, BedAddress>> {
        self.occupancy.lock().expect("occupancy index poisoned")
    }
}

/// Pick the target bed for a move. A named bed must exist and be vacant; an
/// occupied named bed counts as no vacancy on the request's terms, which may
/// clear later. The student's own bed never qualifies since it is occupied.
fn resolve_target_bed(room: &Room, desired_bed: Option<u8>) -> Result<u8, AllocationError> {
    match desired_bed {
        Some(bed_number) => {
            let bed = room
                .bed(bed_number)
                .ok_or_else(|| InventoryError::BedNotFound {
                    room_id: room.id.clone(),
                    bed_number,
                })?;
            if bed.occupant.is_some() {
                return Err(AllocationError::NoVacancyAvailable {
                    room_id: room.id.clone(),
                });
            }
            Ok(bed_number)
        }
        None => room
            .first_vacant_bed()
            .ok_or_else(|| AllocationError::NoVacancyAvailable {
                room_id: room.id.clone(),
            }),
    }
}
