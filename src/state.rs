//! Application state management
//!
//! Contains shared state accessible across all handlers. Every store is
//! in-memory and internally locked; the portal is the system of record.

use crate::announcements::AnnouncementStore;
use crate::appointments::AppointmentStore;
use crate::audit::AuditLog;
use crate::config::Settings;
use crate::hostels::HostelStore;
use crate::library::LibraryStore;
use crate::registrar::RegistrarStore;
use crate::requests::RequestStore;
use crate::students::StudentStore;
use crate::users::UserStore;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Resolved configuration, loaded once at startup
    pub settings: Settings,

    /// Accounts, including pending self-registrations
    pub users: UserStore,

    /// Student records
    pub students: StudentStore,

    /// Courses and enrollments (one lock; transfers are atomic)
    pub registrar: RegistrarStore,

    /// Books and borrowings (one lock; availability accounting)
    pub library: LibraryStore,

    /// Hostels and rooms (one lock; derived occupancy)
    pub hostels: HostelStore,

    /// Appointment scheduling
    pub appointments: AppointmentStore,

    /// Announcements and per-user read markers
    pub announcements: AnnouncementStore,

    /// Pending student asks awaiting an admin decision
    pub requests: RequestStore,

    /// Append-only log of privileged mutations
    pub audit: AuditLog,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            users: UserStore::new(),
            students: StudentStore::new(),
            registrar: RegistrarStore::new(),
            library: LibraryStore::new(),
            hostels: HostelStore::new(),
            appointments: AppointmentStore::new(),
            announcements: AnnouncementStore::new(),
            requests: RequestStore::new(),
            audit: AuditLog::new(),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
