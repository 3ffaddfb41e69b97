//! Hostel storage

use crate::error::AppError;
use crate::hostels::{Hostel, HostelFilter, HostelUpdate, Room, RoomUpdate, RoomWarning};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct HostelMaps {
    hostels: HashMap<Uuid, Hostel>,
    rooms: HashMap<Uuid, Room>,
}

fn recount_occupancy(maps: &mut HostelMaps, hostel_id: Uuid) {
    let occupied = maps
        .rooms
        .values()
        .filter(|r| r.hostel_id == hostel_id && !r.residents.is_empty())
        .count() as u32;
    if let Some(hostel) = maps.hostels.get_mut(&hostel_id) {
        hostel.occupied_rooms = occupied;
        hostel.updated_at = Utc::now();
    }
}

/// Thread-safe hostel store
pub struct HostelStore {
    inner: RwLock<HostelMaps>,
    version: AtomicU64,
}

impl HostelStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HostelMaps::default()),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    // =========================================================================
    // HOSTELS
    // =========================================================================

    /// Register a hostel; it starts with every room unoccupied
    pub async fn create_hostel(&self, mut hostel: Hostel) -> Result<Hostel, AppError> {
        let mut inner = self.inner.write().await;

        // Occupancy is owned by the store
        hostel.occupied_rooms = 0;
        inner.hostels.insert(hostel.id, hostel.clone());
        self.bump();

        Ok(hostel)
    }

    /// Get a hostel by id
    pub async fn get_hostel(&self, id: Uuid) -> Result<Hostel, AppError> {
        let inner = self.inner.read().await;
        inner
            .hostels
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Hostel {} not found", id)))
    }

    /// List hostels matching the filter, ordered by name
    pub async fn list_hostels(&self, filter: &HostelFilter) -> Vec<Hostel> {
        let inner = self.inner.read().await;
        let mut hostels: Vec<Hostel> = inner
            .hostels
            .values()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect();
        hostels.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        hostels
    }

    /// Overlay provided fields; total_rooms may not drop below the number
    /// of rooms already registered
    pub async fn update_hostel(&self, id: Uuid, updates: HostelUpdate) -> Result<Hostel, AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let registered = inner.rooms.values().filter(|r| r.hostel_id == id).count() as u32;
        let hostel = inner
            .hostels
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Hostel {} not found", id)))?;

        if let Some(total) = updates.total_rooms {
            if total < registered {
                return Err(AppError::Conflict(format!(
                    "{} rooms are registered, total cannot drop below that",
                    registered
                )));
            }
            hostel.total_rooms = total;
        }
        if let Some(name) = updates.name {
            hostel.name = name;
        }
        if let Some(warden) = updates.warden {
            hostel.warden = warden;
        }

        hostel.updated_at = Utc::now();
        let hostel = hostel.clone();
        self.bump();

        Ok(hostel)
    }

    /// Remove a hostel; refused while it still has rooms
    pub async fn delete_hostel(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        if !inner.hostels.contains_key(&id) {
            return Err(AppError::NotFound(format!("Hostel {} not found", id)));
        }
        if inner.rooms.values().any(|r| r.hostel_id == id) {
            return Err(AppError::Conflict(
                "Hostel still has registered rooms".to_string(),
            ));
        }

        inner.hostels.remove(&id);
        self.bump();

        Ok(())
    }

    // =========================================================================
    // ROOMS
    // =========================================================================

    /// Register a room under a hostel
    pub async fn add_room(&self, mut room: Room) -> Result<Room, AppError> {
        let mut inner = self.inner.write().await;

        let hostel = inner
            .hostels
            .get(&room.hostel_id)
            .ok_or_else(|| AppError::NotFound(format!("Hostel {} not found", room.hostel_id)))?;

        let registered = inner
            .rooms
            .values()
            .filter(|r| r.hostel_id == room.hostel_id)
            .count() as u32;
        if registered >= hostel.total_rooms {
            return Err(AppError::Conflict(format!(
                "All {} rooms of {} are already registered",
                hostel.total_rooms, hostel.name
            )));
        }
        if inner
            .rooms
            .values()
            .any(|r| r.hostel_id == room.hostel_id && r.room_number == room.room_number)
        {
            return Err(AppError::Conflict(format!(
                "Room {} already exists in {}",
                room.room_number, hostel.name
            )));
        }

        // Residents are assigned through their own endpoint
        room.residents.clear();
        room.warnings.clear();
        inner.rooms.insert(room.id, room.clone());
        self.bump();

        Ok(room)
    }

    /// Get a room by id
    pub async fn get_room(&self, id: Uuid) -> Result<Room, AppError> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
    }

    /// List rooms, optionally scoped to a hostel or a floor
    pub async fn list_rooms(&self, hostel_id: Option<Uuid>, floor: Option<i32>) -> Vec<Room> {
        let inner = self.inner.read().await;
        let mut rooms: Vec<Room> = inner
            .rooms
            .values()
            .filter(|r| hostel_id.map_or(true, |h| r.hostel_id == h))
            .filter(|r| floor.map_or(true, |f| r.floor == f))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.room_number.cmp(&b.room_number).then(a.id.cmp(&b.id)));
        rooms
    }

    /// Overlay provided fields; capacity may not drop below current residents
    pub async fn update_room(&self, id: Uuid, updates: RoomUpdate) -> Result<Room, AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let (hostel_id, current_number) = {
            let room = inner
                .rooms
                .get(&id)
                .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))?;
            (room.hostel_id, room.room_number.clone())
        };

        if let Some(number) = updates.room_number.as_deref() {
            if number != current_number
                && inner
                    .rooms
                    .values()
                    .any(|r| r.hostel_id == hostel_id && r.room_number == number)
            {
                return Err(AppError::Conflict(format!(
                    "Room {} already exists in this hostel",
                    number
                )));
            }
        }

        let room = inner
            .rooms
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))?;

        if let Some(capacity) = updates.capacity {
            if (capacity as usize) < room.residents.len() {
                return Err(AppError::Conflict(format!(
                    "{} residents are assigned, capacity cannot drop below that",
                    room.residents.len()
                )));
            }
            room.capacity = capacity;
        }
        if let Some(number) = updates.room_number {
            room.room_number = number;
        }
        if let Some(floor) = updates.floor {
            room.floor = floor;
        }

        room.updated_at = Utc::now();
        let room = room.clone();
        self.bump();

        Ok(room)
    }

    /// Remove a room; refused while residents are assigned
    pub async fn delete_room(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let room = inner
            .rooms
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))?;
        if !room.residents.is_empty() {
            return Err(AppError::Conflict("Room still has residents".to_string()));
        }

        let hostel_id = room.hostel_id;
        inner.rooms.remove(&id);
        recount_occupancy(inner, hostel_id);
        self.bump();

        Ok(())
    }

    /// Assign a student to a room; capacity is checked under the write lock
    pub async fn assign_resident(&self, room_id: Uuid, student_id: &str) -> Result<Room, AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let room = inner
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?;

        if room.residents.iter().any(|r| r == student_id) {
            return Err(AppError::Conflict(format!(
                "Student {} is already in room {}",
                student_id, room.room_number
            )));
        }
        if room.is_full() {
            return Err(AppError::Conflict(format!(
                "Room {} is full",
                room.room_number
            )));
        }

        room.residents.push(student_id.to_string());
        room.updated_at = Utc::now();
        let hostel_id = room.hostel_id;
        let room = room.clone();

        recount_occupancy(inner, hostel_id);
        self.bump();

        Ok(room)
    }

    /// Remove a student from a room
    pub async fn remove_resident(&self, room_id: Uuid, student_id: &str) -> Result<Room, AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let room = inner
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?;

        let before = room.residents.len();
        room.residents.retain(|r| r != student_id);
        if room.residents.len() == before {
            return Err(AppError::NotFound(format!(
                "Student {} is not in room {}",
                student_id, room.room_number
            )));
        }

        room.updated_at = Utc::now();
        let hostel_id = room.hostel_id;
        let room = room.clone();

        recount_occupancy(inner, hostel_id);
        self.bump();

        Ok(room)
    }

    /// Record a warning against a room
    pub async fn add_warning(&self, room_id: Uuid, message: String) -> Result<Room, AppError> {
        let mut inner = self.inner.write().await;

        let room = inner
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?;

        room.warnings.push(RoomWarning {
            message,
            issued_at: Utc::now(),
        });
        room.updated_at = Utc::now();
        let room = room.clone();
        self.bump();

        Ok(room)
    }
}

impl Default for HostelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostels::HostelKind;
    use pretty_assertions::assert_eq;

    fn sample_hostel(name: &str, total_rooms: u32) -> Hostel {
        Hostel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: HostelKind::Boys,
            total_rooms,
            // Deliberately wrong: the store must zero this
            occupied_rooms: 7,
            warden: "Mr. Sharma".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_room(hostel_id: Uuid, number: &str, capacity: u32) -> Room {
        Room {
            id: Uuid::new_v4(),
            hostel_id,
            room_number: number.to_string(),
            floor: 1,
            capacity,
            residents: Vec::new(),
            warnings: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_new_hostel_starts_unoccupied() {
        let store = HostelStore::new();
        store
            .create_hostel(sample_hostel("North Hall", 50))
            .await
            .unwrap();

        let all = store.list_hostels(&HostelFilter::default()).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "North Hall");
        assert_eq!(all[0].total_rooms, 50);
        assert_eq!(all[0].occupied_rooms, 0);
    }

    #[tokio::test]
    async fn test_room_capacity_is_enforced() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("North Hall", 10))
            .await
            .unwrap();
        let room = store
            .add_room(sample_room(hostel.id, "101", 2))
            .await
            .unwrap();

        store.assign_resident(room.id, "STU-1").await.unwrap();
        store.assign_resident(room.id, "STU-2").await.unwrap();

        let err = store.assign_resident(room.id, "STU-3").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let room = store.get_room(room.id).await.unwrap();
        assert_eq!(room.residents.len(), 2);
    }

    #[tokio::test]
    async fn test_occupancy_is_recounted_from_rooms() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("North Hall", 10))
            .await
            .unwrap();
        let room = store
            .add_room(sample_room(hostel.id, "101", 2))
            .await
            .unwrap();
        store.add_room(sample_room(hostel.id, "102", 2)).await.unwrap();

        store.assign_resident(room.id, "STU-1").await.unwrap();
        store.assign_resident(room.id, "STU-2").await.unwrap();
        // Two residents in the same room still occupy one room
        assert_eq!(store.get_hostel(hostel.id).await.unwrap().occupied_rooms, 1);

        store.remove_resident(room.id, "STU-1").await.unwrap();
        assert_eq!(store.get_hostel(hostel.id).await.unwrap().occupied_rooms, 1);

        store.remove_resident(room.id, "STU-2").await.unwrap();
        assert_eq!(store.get_hostel(hostel.id).await.unwrap().occupied_rooms, 0);
    }

    #[tokio::test]
    async fn test_duplicate_room_number_within_hostel_is_conflict() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("North Hall", 10))
            .await
            .unwrap();
        store.add_room(sample_room(hostel.id, "101", 2)).await.unwrap();

        let err = store
            .add_room(sample_room(hostel.id, "101", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Same number in another hostel is fine
        let other = store
            .create_hostel(sample_hostel("South Hall", 10))
            .await
            .unwrap();
        store.add_room(sample_room(other.id, "101", 2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_room_registry_capped_by_total_rooms() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("Tiny Hall", 1))
            .await
            .unwrap();
        store.add_room(sample_room(hostel.id, "101", 2)).await.unwrap();

        let err = store
            .add_room(sample_room(hostel.id, "102", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_resident_is_conflict() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("North Hall", 10))
            .await
            .unwrap();
        let room = store
            .add_room(sample_room(hostel.id, "101", 3))
            .await
            .unwrap();

        store.assign_resident(room.id, "STU-1").await.unwrap();
        let err = store.assign_resident(room.id, "STU-1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_warning_is_recorded() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("North Hall", 10))
            .await
            .unwrap();
        let room = store
            .add_room(sample_room(hostel.id, "101", 2))
            .await
            .unwrap();

        let room = store
            .add_warning(room.id, "Broken window latch".to_string())
            .await
            .unwrap();
        assert_eq!(room.warnings.len(), 1);
        assert_eq!(room.warnings[0].message, "Broken window latch");
    }

    #[tokio::test]
    async fn test_delete_occupied_room_is_conflict() {
        let store = HostelStore::new();
        let hostel = store
            .create_hostel(sample_hostel("North Hall", 10))
            .await
            .unwrap();
        let room = store
            .add_room(sample_room(hostel.id, "101", 2))
            .await
            .unwrap();
        store.assign_resident(room.id, "STU-1").await.unwrap();

        let err = store.delete_room(room.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        store.remove_resident(room.id, "STU-1").await.unwrap();
        store.delete_room(room.id).await.unwrap();
    }
}
