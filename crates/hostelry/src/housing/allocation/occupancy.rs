use std::sync::Arc;

use serde::Serialize;

use super::domain::{Room, RoomId, RoomStatusView};
use super::inventory::{InventoryError, RoomInventory};

/// Read-only projections over the live inventory for dashboards and
/// reporting. Nothing here mutates state or caches results; every call reads
/// the inventory afresh so a projection can never mask an allocation race.
pub struct OccupancyView {
    inventory: Arc<RoomInventory>,
}

/// Hostel-wide dashboard projection.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancySummary {
    pub total_rooms: usize,
    pub total_beds: usize,
    pub occupied_beds: usize,
    pub occupancy_rate: f64,
    pub rooms: Vec<RoomStatusView>,
}

/// Advisory placement hint. The hint carries no authority: callers feed it
/// back through the allocation or change-request paths, which re-check every
/// precondition.
#[derive(Debug, Clone, Serialize)]
pub struct BedSuggestion {
    pub room_id: RoomId,
    pub bed_number: u8,
    pub reason: String,
}

impl OccupancyView {
    pub fn new(inventory: Arc<RoomInventory>) -> Self {
        Self { inventory }
    }

    pub fn room_status(&self, room_id: &RoomId) -> Result<RoomStatusView, InventoryError> {
        Ok(self.inventory.get_room(room_id)?.status_view())
    }

    /// Occupied beds over total beds; zero while the hostel has no rooms.
    pub fn hostel_occupancy_rate(&self) -> f64 {
        let rooms = self.inventory.list_rooms();
        let total_beds: usize = rooms.iter().map(|room| room.beds.len()).sum();
        if total_beds == 0 {
            return 0.0;
        }
        let occupied_beds: usize = rooms.iter().map(Room::occupied_count).sum();
        occupied_beds as f64 / total_beds as f64
    }

    pub fn summary(&self) -> OccupancySummary {
        let rooms = self.inventory.list_rooms();
        let total_beds: usize = rooms.iter().map(|room| room.beds.len()).sum();
        let occupied_beds: usize = rooms.iter().map(Room::occupied_count).sum();
        let occupancy_rate = if total_beds == 0 {
            0.0
        } else {
            occupied_beds as f64 / total_beds as f64
        };

        OccupancySummary {
            total_rooms: rooms.len(),
            total_beds,
            occupied_beds,
            occupancy_rate,
            rooms: rooms.iter().map(Room::status_view).collect(),
        }
    }

    /// First vacant bed in the preferred block when one is named, otherwise
    /// the first vacant bed anywhere.
    pub fn suggest_bed(&self, preferred_block: Option<&str>) -> Option<BedSuggestion> {
        let rooms = self.inventory.list_rooms();

        let in_block = rooms
            .iter()
            .filter(|room| preferred_block.map_or(true, |block| room.block == block))
            .find_map(|room| room.first_vacant_bed().map(|bed| (room, bed)));
        let (room, bed_number) = in_block.or_else(|| {
            rooms
                .iter()
                .find_map(|room| room.first_vacant_bed().map(|bed| (room, bed)))
        })?;

        Some(BedSuggestion {
            room_id: room.id.clone(),
            bed_number,
            reason: format!(
                "bed {} in room {} ({}) is vacant",
                bed_number, room.room_number, room.block
            ),
        })
    }
}
