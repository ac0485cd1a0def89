//! Core engine for the hostel management service: room/bed inventory,
//! allocation, room-change requests, and occupancy projections, plus the
//! configuration and telemetry plumbing shared with the API binary.

pub mod config;
pub mod error;
pub mod housing;
pub mod telemetry;
