//! Student records
//!
//! Registry of students known to the portal. The `student_id` field is the
//! university-issued key ("STU-1042") used by enrollments, borrowings and
//! room assignments; the store keeps it unique.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
}

impl Default for StudentStatus {
    fn default() -> Self {
        StudentStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    /// University-issued key, unique across the store
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: String,
    pub year: u8,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update, only provided fields overlay
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub year: Option<u8>,
    pub status: Option<StudentStatus>,
}

/// List filters, all optional and combinable
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    /// Case-insensitive substring over student_id, name and email
    pub search: Option<String>,
    pub department: Option<String>,
    pub status: Option<StudentStatus>,
}

impl StudentFilter {
    fn matches(&self, student: &Student) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            student.student_id.to_lowercase().contains(&q)
                || student.name.to_lowercase().contains(&q)
                || student.email.to_lowercase().contains(&q)
        });
        let department_ok = self
            .department
            .as_deref()
            .map_or(true, |d| student.department.eq_ignore_ascii_case(d));
        let status_ok = self.status.map_or(true, |s| student.status == s);

        search_ok && department_ok && status_ok
    }
}

#[derive(Default)]
struct StudentMaps {
    students: HashMap<Uuid, Student>,
    /// student_id -> record id
    key_index: HashMap<String, Uuid>,
}

/// Thread-safe student store
pub struct StudentStore {
    inner: RwLock<StudentMaps>,
    version: AtomicU64,
}

impl StudentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StudentMaps::default()),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Create a student record
    pub async fn create(&self, student: Student) -> Result<Student, AppError> {
        let mut inner = self.inner.write().await;

        if inner.key_index.contains_key(&student.student_id) {
            return Err(AppError::Conflict(format!(
                "Student {} already exists",
                student.student_id
            )));
        }

        inner
            .key_index
            .insert(student.student_id.clone(), student.id);
        inner.students.insert(student.id, student.clone());
        self.bump();

        Ok(student)
    }

    /// Get a student by record id
    pub async fn get(&self, id: Uuid) -> Result<Student, AppError> {
        let inner = self.inner.read().await;
        inner
            .students
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))
    }

    /// Look up by the university-issued key
    pub async fn find_by_student_id(&self, student_id: &str) -> Option<Student> {
        let inner = self.inner.read().await;
        inner
            .key_index
            .get(student_id)
            .and_then(|id| inner.students.get(id).cloned())
    }

    /// List students matching the filter, newest first
    pub async fn list(&self, filter: &StudentFilter) -> Vec<Student> {
        let inner = self.inner.read().await;
        let mut students: Vec<Student> = inner
            .students
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        students.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        students
    }

    /// Overlay provided fields onto an existing record
    pub async fn update(&self, id: Uuid, updates: StudentUpdate) -> Result<Student, AppError> {
        let mut inner = self.inner.write().await;

        let student = inner
            .students
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))?;

        if let Some(name) = updates.name {
            student.name = name;
        }
        if let Some(email) = updates.email {
            student.email = email;
        }
        if let Some(phone) = updates.phone {
            student.phone = Some(phone);
        }
        if let Some(department) = updates.department {
            student.department = department;
        }
        if let Some(year) = updates.year {
            student.year = year;
        }
        if let Some(status) = updates.status {
            student.status = status;
        }

        student.updated_at = Utc::now();
        let student = student.clone();
        self.bump();

        Ok(student)
    }

    /// Delete a student record
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        let student = inner
            .students
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", id)))?;

        inner.key_index.remove(&student.student_id);
        self.bump();

        Ok(())
    }
}

impl Default for StudentStore {
    fn default() -> Self {
        Self::new()
    }
}
