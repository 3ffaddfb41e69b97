//! Registrar data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A course in the catalog. `code` is the natural key ("CS101").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub code: String,
    pub name: String,
    pub credits: u8,
    pub instructor: String,
    pub semester: String,
    /// Seat count maintained by the store, never accepted from clients
    pub enrolled: u32,
    pub capacity: u32,
    pub category: String,
    pub course_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn available_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }
}

/// Partial course update, only provided fields overlay
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub credits: Option<u8>,
    pub instructor: Option<String>,
    pub semester: Option<String>,
    pub capacity: Option<u32>,
    pub category: Option<String>,
    pub course_type: Option<String>,
}

/// One hop in an enrollment's transfer history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub from_course: String,
    pub to_course: String,
    pub transferred_at: DateTime<Utc>,
}

/// A student's seat in a course
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: String,
    pub course_code: String,
    /// Set at first enrollment and preserved across transfers
    pub enrolled_at: DateTime<Utc>,
    pub transfer_history: Vec<TransferRecord>,
}

impl Enrollment {
    pub fn new(student_id: String, course_code: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            course_code,
            enrolled_at: Utc::now(),
            transfer_history: Vec::new(),
        }
    }
}

/// Course list filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFilter {
    /// Case-insensitive substring over code, name and instructor
    pub search: Option<String>,
    pub category: Option<String>,
    pub semester: Option<String>,
}

impl CourseFilter {
    pub(crate) fn matches(&self, course: &Course) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            course.code.to_lowercase().contains(&q)
                || course.name.to_lowercase().contains(&q)
                || course.instructor.to_lowercase().contains(&q)
        });
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| course.category.eq_ignore_ascii_case(c));
        let semester_ok = self
            .semester
            .as_deref()
            .map_or(true, |s| course.semester.eq_ignore_ascii_case(s));

        search_ok && category_ok && semester_ok
    }
}
