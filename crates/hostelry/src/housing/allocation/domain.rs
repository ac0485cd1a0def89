use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for rooms. Ordered so operations spanning two rooms can
/// take their locks in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a student, owned by the identity subsystem. The engine only
/// stores and compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for room-change requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Single,
    Double,
    Triple,
}

impl RoomType {
    pub const fn label(self) -> &'static str {
        match self {
            RoomType::Single => "Single",
            RoomType::Double => "Double",
            RoomType::Triple => "Triple",
        }
    }
}

/// Derived occupancy label. Always computed from bed state, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Vacant,
    Partial,
    Full,
}

impl RoomStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RoomStatus::Vacant => "vacant",
            RoomStatus::Partial => "partial",
            RoomStatus::Full => "full",
        }
    }
}

/// One sleeping slot inside a room. A vacant bed carries no occupant; there is
/// no sentinel student id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub bed_number: u8,
    pub occupant: Option<StudentId>,
}

/// Parameters accepted when registering a new room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub room_number: String,
    pub block: String,
    pub floor: u16,
    pub room_type: RoomType,
    pub capacity: u8,
    pub price_per_month: u32,
}

/// A physical room and its beds. `beds.len()` equals `capacity` for the
/// lifetime of the room; capacity is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    pub block: String,
    pub floor: u16,
    pub room_type: RoomType,
    pub capacity: u8,
    pub price_per_month: u32,
    pub beds: Vec<Bed>,
}

impl Room {
    pub fn occupied_count(&self) -> usize {
        self.beds.iter().filter(|bed| bed.occupant.is_some()).count()
    }

    pub fn status(&self) -> RoomStatus {
        match self.occupied_count() {
            0 => RoomStatus::Vacant,
            n if n == self.capacity as usize => RoomStatus::Full,
            _ => RoomStatus::Partial,
        }
    }

    pub fn bed(&self, bed_number: u8) -> Option<&Bed> {
        self.beds.iter().find(|bed| bed.bed_number == bed_number)
    }

    /// Lowest-numbered vacant bed, if any.
    pub fn first_vacant_bed(&self) -> Option<u8> {
        self.beds
            .iter()
            .find(|bed| bed.occupant.is_none())
            .map(|bed| bed.bed_number)
    }

    /// Low-level occupant write. Only the allocation service calls this, while
    /// holding the room lock and after its precondition checks.
    pub(crate) fn set_occupant(&mut self, bed_number: u8, occupant: Option<StudentId>) {
        if let Some(bed) = self.beds.iter_mut().find(|bed| bed.bed_number == bed_number) {
            bed.occupant = occupant;
        }
    }

    pub fn status_view(&self) -> RoomStatusView {
        RoomStatusView {
            room_id: self.id.clone(),
            room_number: self.room_number.clone(),
            occupied_count: self.occupied_count(),
            capacity: self.capacity,
            status: self.status(),
        }
    }
}

/// Where a student currently sleeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAddress {
    pub room_id: RoomId,
    pub bed_number: u8,
}

/// Per-room dashboard projection.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatusView {
    pub room_id: RoomId,
    pub room_number: String,
    pub occupied_count: usize,
    pub capacity: u8,
    pub status: RoomStatus,
}

/// High level lifecycle of a room-change request. `Approved` and `Rejected`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

/// A student's request to move beds. Resolution is write-once: a terminal
/// request never mutates again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomChangeRequest {
    pub id: RequestId,
    pub student_id: StudentId,
    pub current_room_id: RoomId,
    pub desired_room_id: RoomId,
    pub desired_bed_number: Option<u8>,
    pub reason: String,
    pub status: RequestStatus,
    pub warden_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RoomChangeRequest {
    pub fn status_view(&self) -> RequestView {
        RequestView {
            request_id: self.id.clone(),
            student_id: self.student_id.clone(),
            desired_room_id: self.desired_room_id.clone(),
            status: self.status.label(),
            warden_note: self.warden_note.clone(),
        }
    }
}

/// Sanitized representation of a request's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub request_id: RequestId,
    pub student_id: StudentId,
    pub desired_room_id: RoomId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warden_note: Option<String>,
}
