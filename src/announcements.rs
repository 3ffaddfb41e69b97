//! Announcements
//!
//! Campus-wide notices ranked by priority. Read markers are kept here,
//! per user, so every device a user signs in from agrees on what is
//! unread.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    Academic,
    Hostel,
    Library,
    General,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Fixed rank used for list ordering
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub kind: AnnouncementKind,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial announcement update
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub kind: Option<AnnouncementKind>,
    pub priority: Option<Priority>,
}

/// List filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementFilter {
    pub kind: Option<AnnouncementKind>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring over title and content
    pub search: Option<String>,
}

impl AnnouncementFilter {
    fn matches(&self, a: &Announcement) -> bool {
        let kind_ok = self.kind.map_or(true, |k| a.kind == k);
        let priority_ok = self.priority.map_or(true, |p| a.priority == p);
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            a.title.to_lowercase().contains(&q) || a.content.to_lowercase().contains(&q)
        });

        kind_ok && priority_ok && search_ok
    }
}

#[derive(Default)]
struct Boards {
    announcements: HashMap<Uuid, Announcement>,
    /// user id -> announcement ids the user has read
    read_markers: HashMap<Uuid, HashSet<Uuid>>,
}

/// Thread-safe announcement store
pub struct AnnouncementStore {
    inner: RwLock<Boards>,
    version: AtomicU64,
}

impl AnnouncementStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Boards::default()),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Publish an announcement
    pub async fn create(&self, announcement: Announcement) -> Result<Announcement, AppError> {
        let mut inner = self.inner.write().await;
        inner
            .announcements
            .insert(announcement.id, announcement.clone());
        self.bump();
        Ok(announcement)
    }

    /// Get an announcement by id
    pub async fn get(&self, id: Uuid) -> Result<Announcement, AppError> {
        let inner = self.inner.read().await;
        inner
            .announcements
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", id)))
    }

    /// List announcements with the reader's unread flag, priority rank
    /// descending and newest first within a rank
    pub async fn list_for_reader(
        &self,
        reader: Uuid,
        filter: &AnnouncementFilter,
    ) -> Vec<(Announcement, bool)> {
        let inner = self.inner.read().await;
        let read = inner.read_markers.get(&reader);

        let mut list: Vec<(Announcement, bool)> = inner
            .announcements
            .values()
            .filter(|a| filter.matches(a))
            .map(|a| {
                let unread = read.map_or(true, |set| !set.contains(&a.id));
                (a.clone(), unread)
            })
            .collect();
        list.sort_by(|(a, _), (b, _)| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        list
    }

    /// Overlay provided fields
    pub async fn update(&self, id: Uuid, updates: AnnouncementUpdate) -> Result<Announcement, AppError> {
        let mut inner = self.inner.write().await;

        let announcement = inner
            .announcements
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", id)))?;

        if let Some(title) = updates.title {
            announcement.title = title;
        }
        if let Some(content) = updates.content {
            announcement.content = content;
        }
        if let Some(kind) = updates.kind {
            announcement.kind = kind;
        }
        if let Some(priority) = updates.priority {
            announcement.priority = priority;
        }

        announcement.updated_at = Utc::now();
        let announcement = announcement.clone();
        self.bump();

        Ok(announcement)
    }

    /// Delete an announcement and every read marker pointing at it
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        inner
            .announcements
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", id)))?;
        for markers in inner.read_markers.values_mut() {
            markers.remove(&id);
        }
        self.bump();

        Ok(())
    }

    /// Record that a user has read an announcement; idempotent
    pub async fn mark_read(&self, reader: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        if !inner.announcements.contains_key(&id) {
            return Err(AppError::NotFound(format!("Announcement {} not found", id)));
        }
        inner.read_markers.entry(reader).or_default().insert(id);

        Ok(())
    }
}

impl Default for AnnouncementStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn sample(title: &str, priority: Priority, age_minutes: i64) -> Announcement {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Announcement {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "Body".to_string(),
            kind: AnnouncementKind::General,
            priority,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_order_is_priority_rank_then_recency() {
        let store = AnnouncementStore::new();
        store.create(sample("old high", Priority::High, 60)).await.unwrap();
        store.create(sample("low", Priority::Low, 5)).await.unwrap();
        store.create(sample("medium", Priority::Medium, 5)).await.unwrap();
        store.create(sample("new high", Priority::High, 1)).await.unwrap();

        let reader = Uuid::new_v4();
        let list = store
            .list_for_reader(reader, &AnnouncementFilter::default())
            .await;
        let titles: Vec<&str> = list.iter().map(|(a, _)| a.title.as_str()).collect();
        assert_eq!(titles, vec!["new high", "old high", "medium", "low"]);
    }

    #[tokio::test]
    async fn test_unread_flag_flips_per_reader() {
        let store = AnnouncementStore::new();
        let a = store.create(sample("notice", Priority::Medium, 1)).await.unwrap();

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.mark_read(alice, a.id).await.unwrap();
        // Marking twice is fine
        store.mark_read(alice, a.id).await.unwrap();

        let for_alice = store
            .list_for_reader(alice, &AnnouncementFilter::default())
            .await;
        assert!(!for_alice[0].1);

        let for_bob = store
            .list_for_reader(bob, &AnnouncementFilter::default())
            .await;
        assert!(for_bob[0].1);
    }

    #[tokio::test]
    async fn test_mark_read_on_missing_announcement_is_not_found() {
        let store = AnnouncementStore::new();
        let err = store
            .mark_read(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_kind_filter() {
        let store = AnnouncementStore::new();
        let mut hostel_notice = sample("water outage", Priority::High, 1);
        hostel_notice.kind = AnnouncementKind::Hostel;
        store.create(hostel_notice).await.unwrap();
        store.create(sample("general", Priority::Low, 1)).await.unwrap();

        let reader = Uuid::new_v4();
        let hostel_only = store
            .list_for_reader(
                reader,
                &AnnouncementFilter {
                    kind: Some(AnnouncementKind::Hostel),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(hostel_only.len(), 1);
        assert_eq!(hostel_only[0].0.title, "water outage");
    }
}
