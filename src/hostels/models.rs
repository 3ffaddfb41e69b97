//! Hostel data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostelKind {
    Boys,
    Girls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hostel {
    pub id: Uuid,
    pub name: String,
    pub kind: HostelKind,
    pub total_rooms: u32,
    /// Count of rooms with at least one resident, recounted by the store
    pub occupied_rooms: u32,
    pub warden: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hostel {
    /// Nearest integer percent, 0 for a hostel with no rooms
    pub fn occupancy_rate(&self) -> u32 {
        if self.total_rooms == 0 {
            return 0;
        }
        ((self.occupied_rooms as f64 / self.total_rooms as f64) * 100.0).round() as u32
    }
}

/// Partial hostel update
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelUpdate {
    pub name: Option<String>,
    pub warden: Option<String>,
    pub total_rooms: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomWarning {
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub hostel_id: Uuid,
    /// Unique within the hostel
    pub room_number: String,
    pub floor: i32,
    pub capacity: u32,
    /// Student ids currently assigned
    pub residents: Vec<String>,
    pub warnings: Vec<RoomWarning>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_full(&self) -> bool {
        self.residents.len() as u32 >= self.capacity
    }
}

/// Partial room update
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    pub room_number: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<u32>,
}

/// Hostel list filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelFilter {
    /// Case-insensitive substring over name and warden
    pub search: Option<String>,
    pub kind: Option<HostelKind>,
}

impl HostelFilter {
    pub(crate) fn matches(&self, hostel: &Hostel) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            hostel.name.to_lowercase().contains(&q) || hostel.warden.to_lowercase().contains(&q)
        });
        let kind_ok = self.kind.map_or(true, |k| hostel.kind == k);

        search_ok && kind_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hostel_with_occupancy(occupied: u32, total: u32) -> Hostel {
        Hostel {
            id: Uuid::new_v4(),
            name: "West Wing".to_string(),
            kind: HostelKind::Girls,
            total_rooms: total,
            occupied_rooms: occupied,
            warden: "Ms. Rao".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_occupancy_rate_rounds_to_nearest_percent() {
        assert_eq!(hostel_with_occupancy(1, 3).occupancy_rate(), 33);
        assert_eq!(hostel_with_occupancy(2, 3).occupancy_rate(), 67);
        assert_eq!(hostel_with_occupancy(0, 50).occupancy_rate(), 0);
        assert_eq!(hostel_with_occupancy(50, 50).occupancy_rate(), 100);
    }

    #[test]
    fn test_occupancy_rate_with_no_rooms_is_zero() {
        assert_eq!(hostel_with_occupancy(0, 0).occupancy_rate(), 0);
    }
}
