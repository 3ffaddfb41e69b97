//! Appointment scheduling
//!
//! Appointments carry a short token the student quotes at the service
//! desk, and a status that moves through a fixed state machine. A
//! department can hold one live appointment per date and time slot.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Token alphabet, ambiguous glyphs (0/O, 1/I) left out
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const TOKEN_LEN: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Legal moves: pending can be approved, rejected or cancelled;
    /// approved can be completed or cancelled; the rest are terminal.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Completed)
                | (Approved, Cancelled)
        )
    }

    /// Live appointments hold their slot; rejected/cancelled/completed free it
    pub fn holds_slot(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub service: String,
    pub department: String,
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Desk token, assigned at creation, unique within the store
    pub token: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; slot fields re-run the double-booking check
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    pub service: Option<String>,
    pub department: Option<String>,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub notes: Option<String>,
}

/// List filters; status and date are the server-side query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub department: Option<String>,
    /// Case-insensitive substring over student name, student id, service and token
    pub search: Option<String>,
}

impl AppointmentFilter {
    fn matches(&self, a: &Appointment) -> bool {
        let status_ok = self.status.map_or(true, |s| a.status == s);
        let date_ok = self.date.map_or(true, |d| a.date == d);
        let department_ok = self
            .department
            .as_deref()
            .map_or(true, |d| a.department.eq_ignore_ascii_case(d));
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            a.student_name.to_lowercase().contains(&q)
                || a.student_id.to_lowercase().contains(&q)
                || a.service.to_lowercase().contains(&q)
                || a.token.to_lowercase().contains(&q)
        });

        status_ok && date_ok && department_ok && search_ok
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect();
    format!("APT-{}", code)
}

/// Thread-safe appointment store
pub struct AppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    version: AtomicU64,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self {
            appointments: RwLock::new(HashMap::new()),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Book an appointment; the slot check and the insert share one lock
    pub async fn create(&self, mut appointment: Appointment) -> Result<Appointment, AppError> {
        let mut appointments = self.appointments.write().await;

        let slot_taken = appointments.values().any(|a| {
            a.status.holds_slot()
                && a.department.eq_ignore_ascii_case(&appointment.department)
                && a.date == appointment.date
                && a.time == appointment.time
        });
        if slot_taken {
            return Err(AppError::Conflict(format!(
                "{} already has an appointment on {} at {}",
                appointment.department, appointment.date, appointment.time
            )));
        }

        appointment.token = generate_token();
        while appointments.values().any(|a| a.token == appointment.token) {
            appointment.token = generate_token();
        }
        appointment.status = AppointmentStatus::Pending;

        appointments.insert(appointment.id, appointment.clone());
        self.bump();

        Ok(appointment)
    }

    /// Get an appointment by id
    pub async fn get(&self, id: Uuid) -> Result<Appointment, AppError> {
        let appointments = self.appointments.read().await;
        appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))
    }

    /// List appointments matching the filter, earliest slot first
    pub async fn list(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        let appointments = self.appointments.read().await;
        let mut list: Vec<Appointment> = appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.time.cmp(&b.time))
                .then(a.id.cmp(&b.id))
        });
        list
    }

    /// Overlay provided fields; a change of department, date or time
    /// re-runs the slot check against every other live appointment
    pub async fn update(&self, id: Uuid, updates: AppointmentUpdate) -> Result<Appointment, AppError> {
        let mut appointments = self.appointments.write().await;

        let current = appointments
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;

        let department = updates
            .department
            .clone()
            .unwrap_or_else(|| current.department.clone());
        let date = updates.date.unwrap_or(current.date);
        let time = updates.time.unwrap_or(current.time);

        let slot_moved =
            !department.eq_ignore_ascii_case(&current.department) || date != current.date || time != current.time;
        if slot_moved && current.status.holds_slot() {
            let slot_taken = appointments.values().any(|a| {
                a.id != id
                    && a.status.holds_slot()
                    && a.department.eq_ignore_ascii_case(&department)
                    && a.date == date
                    && a.time == time
            });
            if slot_taken {
                return Err(AppError::Conflict(format!(
                    "{} already has an appointment on {} at {}",
                    department, date, time
                )));
            }
        }

        let appointment = appointments
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;

        if let Some(service) = updates.service {
            appointment.service = service;
        }
        appointment.department = department;
        appointment.date = date;
        appointment.time = time;
        if let Some(name) = updates.student_name {
            appointment.student_name = name;
        }
        if let Some(email) = updates.student_email {
            appointment.student_email = email;
        }
        if let Some(notes) = updates.notes {
            appointment.notes = Some(notes);
        }

        appointment.updated_at = Utc::now();
        let appointment = appointment.clone();
        self.bump();

        Ok(appointment)
    }

    /// Advance the status machine; illegal moves are a 400
    pub async fn update_status(
        &self,
        id: Uuid,
        next: AppointmentStatus,
        note: Option<String>,
    ) -> Result<Appointment, AppError> {
        let mut appointments = self.appointments.write().await;

        let appointment = appointments
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;

        if !appointment.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot move appointment from {} to {}",
                appointment.status, next
            )));
        }

        appointment.status = next;
        if let Some(note) = note {
            appointment.notes = Some(note);
        }
        appointment.updated_at = Utc::now();
        let appointment = appointment.clone();
        self.bump();

        Ok(appointment)
    }

    /// Delete an appointment
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut appointments = self.appointments.write().await;

        appointments
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;
        self.bump();

        Ok(())
    }
}

impl Default for AppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}
