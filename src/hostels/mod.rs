//! Hostels module - hostels and their rooms
//!
//! Occupancy is never stored as client input: a hostel's occupied_rooms
//! is recounted from its rooms whenever residents change, inside the
//! same lock.

mod models;
mod store;

pub use models::*;
pub use store::HostelStore;
