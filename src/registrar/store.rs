//! Registrar storage
//!
//! One lock over the course catalog and the enrollment table. Capacity
//! checks, duplicate checks and the transfer operation all run inside a
//! single write-lock acquisition, so no intermediate state is observable.

use crate::error::AppError;
use crate::registrar::{Course, CourseFilter, CourseUpdate, Enrollment, TransferRecord};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct RegistrarMaps {
    /// Keyed by uppercase course code
    courses: HashMap<String, Course>,
    enrollments: HashMap<Uuid, Enrollment>,
}

/// Thread-safe registrar store
pub struct RegistrarStore {
    inner: RwLock<RegistrarMaps>,
    version: AtomicU64,
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl RegistrarStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistrarMaps::default()),
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
    // COURSES
    // =========================================================================

    /// Add a course to the catalog
    pub async fn create_course(&self, mut course: Course) -> Result<Course, AppError> {
        let mut inner = self.inner.write().await;

        course.code = normalize_code(&course.code);
        // Seat count is owned by the store
        course.enrolled = 0;

        if inner.courses.contains_key(&course.code) {
            return Err(AppError::Conflict(format!(
                "Course {} already exists",
                course.code
            )));
        }

        inner.courses.insert(course.code.clone(), course.clone());
        self.bump();

        Ok(course)
    }

    /// Get a course by code
    pub async fn get_course(&self, code: &str) -> Result<Course, AppError> {
        let inner = self.inner.read().await;
        inner
            .courses
            .get(&normalize_code(code))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", normalize_code(code))))
    }

    /// List courses matching the filter, ordered by code
    pub async fn list_courses(&self, filter: &CourseFilter) -> Vec<Course> {
        let inner = self.inner.read().await;
        let mut courses: Vec<Course> = inner
            .courses
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        courses
    }

    /// Overlay provided fields; capacity may not drop below current enrollment
    pub async fn update_course(&self, code: &str, updates: CourseUpdate) -> Result<Course, AppError> {
        let mut inner = self.inner.write().await;

        let code = normalize_code(code);
        let course = inner
            .courses
            .get_mut(&code)
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", code)))?;

        if let Some(capacity) = updates.capacity {
            if capacity < course.enrolled {
                return Err(AppError::Conflict(format!(
                    "Capacity {} is below current enrollment {}",
                    capacity, course.enrolled
                )));
            }
            course.capacity = capacity;
        }
        if let Some(name) = updates.name {
            course.name = name;
        }
        if let Some(credits) = updates.credits {
            course.credits = credits;
        }
        if let Some(instructor) = updates.instructor {
            course.instructor = instructor;
        }
        if let Some(semester) = updates.semester {
            course.semester = semester;
        }
        if let Some(category) = updates.category {
            course.category = category;
        }
        if let Some(course_type) = updates.course_type {
            course.course_type = course_type;
        }

        course.updated_at = Utc::now();
        let course = course.clone();
        self.bump();

        Ok(course)
    }

    /// Remove a course; refused while enrollments still reference it
    pub async fn delete_course(&self, code: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        let code = normalize_code(code);
        if !inner.courses.contains_key(&code) {
            return Err(AppError::NotFound(format!("Course {} not found", code)));
        }
        if inner.enrollments.values().any(|e| e.course_code == code) {
            return Err(AppError::Conflict(format!(
                "Course {} still has enrollments",
                code
            )));
        }

        inner.courses.remove(&code);
        self.bump();

        Ok(())
    }

    // =========================================================================
    // ENROLLMENTS
    // =========================================================================

    /// Enroll a student, taking one seat
    pub async fn enroll(&self, student_id: &str, course_code: &str) -> Result<Enrollment, AppError> {
        let mut inner = self.inner.write().await;

        let code = normalize_code(course_code);
        let course = inner
            .courses
            .get(&code)
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", code)))?;

        if course.is_full() {
            return Err(AppError::Conflict(format!("Course {} is full", code)));
        }
        if inner
            .enrollments
            .values()
            .any(|e| e.student_id == student_id && e.course_code == code)
        {
            return Err(AppError::Conflict(format!(
                "Student {} is already enrolled in {}",
                student_id, code
            )));
        }

        let enrollment = Enrollment::new(student_id.to_string(), code.clone());
        inner.enrollments.insert(enrollment.id, enrollment.clone());
        if let Some(course) = inner.courses.get_mut(&code) {
            course.enrolled += 1;
            course.updated_at = Utc::now();
        }
        self.bump();

        info!("Enrolled {} in {}", enrollment.student_id, code);
        Ok(enrollment)
    }

    /// Get an enrollment by id
    pub async fn get_enrollment(&self, id: Uuid) -> Result<Enrollment, AppError> {
        let inner = self.inner.read().await;
        inner
            .enrollments
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", id)))
    }

    /// List enrollments, optionally scoped to a course or a student
    pub async fn list_enrollments(
        &self,
        course_code: Option<&str>,
        student_id: Option<&str>,
    ) -> Vec<Enrollment> {
        let inner = self.inner.read().await;
        let code = course_code.map(normalize_code);
        let mut enrollments: Vec<Enrollment> = inner
            .enrollments
            .values()
            .filter(|e| code.as_deref().map_or(true, |c| e.course_code == c))
            .filter(|e| student_id.map_or(true, |s| e.student_id == s))
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at).then(b.id.cmp(&a.id)));
        enrollments
    }

    /// Drop an enrollment, releasing its seat
    pub async fn unenroll(&self, id: Uuid) -> Result<Enrollment, AppError> {
        let mut inner = self.inner.write().await;

        let enrollment = inner
            .enrollments
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", id)))?;

        if let Some(course) = inner.courses.get_mut(&enrollment.course_code) {
            course.enrolled = course.enrolled.saturating_sub(1);
            course.updated_at = Utc::now();
        }
        self.bump();

        Ok(enrollment)
    }

    /// Drop a student's enrollment in a course, looked up by the pair
    pub async fn unenroll_student(
        &self,
        student_id: &str,
        course_code: &str,
    ) -> Result<Enrollment, AppError> {
        let mut inner = self.inner.write().await;

        let code = normalize_code(course_code);
        let id = inner
            .enrollments
            .values()
            .find(|e| e.student_id == student_id && e.course_code == code)
            .map(|e| e.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Student {} is not enrolled in {}",
                    student_id, code
                ))
            })?;

        let enrollment = inner
            .enrollments
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", id)))?;
        if let Some(course) = inner.courses.get_mut(&code) {
            course.enrolled = course.enrolled.saturating_sub(1);
            course.updated_at = Utc::now();
        }
        self.bump();

        Ok(enrollment)
    }

    /// Move an enrollment to another course in one step
    ///
    /// Validates the target while holding the write lock, then retargets
    /// the enrollment and adjusts both seat counts. `enrolled_at` is
    /// preserved; a history entry records the hop. On any failure nothing
    /// has changed.
    pub async fn transfer(
        &self,
        enrollment_id: Uuid,
        to_course: &str,
    ) -> Result<Enrollment, AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let to_code = normalize_code(to_course);

        let (from_code, student_id) = {
            let enrollment = inner.enrollments.get(&enrollment_id).ok_or_else(|| {
                AppError::NotFound(format!("Enrollment {} not found", enrollment_id))
            })?;
            (enrollment.course_code.clone(), enrollment.student_id.clone())
        };

        if from_code == to_code {
            return Err(AppError::BadRequest(format!(
                "Enrollment is already in {}",
                to_code
            )));
        }

        let target = inner
            .courses
            .get(&to_code)
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", to_code)))?;
        if target.is_full() {
            return Err(AppError::Conflict(format!("Course {} is full", to_code)));
        }
        if inner
            .enrollments
            .values()
            .any(|e| e.student_id == student_id && e.course_code == to_code)
        {
            return Err(AppError::Conflict(format!(
                "Student {} is already enrolled in {}",
                student_id, to_code
            )));
        }

        let now = Utc::now();
        let transferred = {
            let enrollment = inner.enrollments.get_mut(&enrollment_id).ok_or_else(|| {
                AppError::NotFound(format!("Enrollment {} not found", enrollment_id))
            })?;
            enrollment.transfer_history.push(TransferRecord {
                from_course: from_code.clone(),
                to_course: to_code.clone(),
                transferred_at: now,
            });
            enrollment.course_code = to_code.clone();
            enrollment.clone()
        };

        if let Some(from) = inner.courses.get_mut(&from_code) {
            from.enrolled = from.enrolled.saturating_sub(1);
            from.updated_at = now;
        }
        if let Some(to) = inner.courses.get_mut(&to_code) {
            to.enrolled += 1;
            to.updated_at = now;
        }
        self.bump();

        info!(
            "Transferred {} from {} to {}",
            transferred.student_id, from_code, to_code
        );
        Ok(transferred)
    }
}

impl Default for RegistrarStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_course(code: &str, capacity: u32) -> Course {
        Course {
            code: code.to_string(),
            name: format!("Course {}", code),
            credits: 4,
            instructor: "Dr. Iyer".to_string(),
            semester: "Fall 2025".to_string(),
            enrolled: 0,
            capacity,
            category: "Core".to_string(),
            course_type: "Lecture".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn store_with_courses() -> RegistrarStore {
        let store = RegistrarStore::new();
        store.create_course(sample_course("CS101", 2)).await.unwrap();
        store.create_course(sample_course("MA201", 1)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_enroll_takes_a_seat() {
        let store = store_with_courses().await;

        let enrollment = store.enroll("STU-1", "cs101").await.unwrap();
        assert_eq!(enrollment.course_code, "CS101");

        let course = store.get_course("CS101").await.unwrap();
        assert_eq!(course.enrolled, 1);
        assert_eq!(course.available_seats(), 1);
    }

    #[tokio::test]
    async fn test_enroll_unknown_course_is_not_found() {
        let store = store_with_courses().await;
        let err = store.enroll("STU-1", "XX999").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_enroll_full_course_is_conflict() {
        let store = store_with_courses().await;
        store.enroll("STU-1", "MA201").await.unwrap();

        let err = store.enroll("STU-2", "MA201").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let course = store.get_course("MA201").await.unwrap();
        assert_eq!(course.enrolled, 1);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_is_conflict() {
        let store = store_with_courses().await;
        store.enroll("STU-1", "CS101").await.unwrap();

        let err = store.enroll("STU-1", "CS101").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_transfer_moves_exactly_one_enrollment() {
        let store = store_with_courses().await;
        let enrollment = store.enroll("STU-1", "CS101").await.unwrap();
        let original_enrolled_at = enrollment.enrolled_at;

        let moved = store.transfer(enrollment.id, "MA201").await.unwrap();

        assert_eq!(moved.course_code, "MA201");
        assert_eq!(moved.enrolled_at, original_enrolled_at);
        assert_eq!(moved.transfer_history.len(), 1);
        assert_eq!(moved.transfer_history[0].from_course, "CS101");
        assert_eq!(moved.transfer_history[0].to_course, "MA201");

        // Exactly one enrollment remains, in the target course
        let in_target = store.list_enrollments(Some("MA201"), Some("STU-1")).await;
        assert_eq!(in_target.len(), 1);
        let in_source = store.list_enrollments(Some("CS101"), Some("STU-1")).await;
        assert!(in_source.is_empty());

        assert_eq!(store.get_course("CS101").await.unwrap().enrolled, 0);
        assert_eq!(store.get_course("MA201").await.unwrap().enrolled, 1);
    }

    #[tokio::test]
    async fn test_transfer_to_full_course_changes_nothing() {
        let store = store_with_courses().await;
        store.enroll("STU-9", "MA201").await.unwrap();
        let enrollment = store.enroll("STU-1", "CS101").await.unwrap();

        let err = store.transfer(enrollment.id, "MA201").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let unchanged = store.get_enrollment(enrollment.id).await.unwrap();
        assert_eq!(unchanged.course_code, "CS101");
        assert!(unchanged.transfer_history.is_empty());
        assert_eq!(store.get_course("CS101").await.unwrap().enrolled, 1);
        assert_eq!(store.get_course("MA201").await.unwrap().enrolled, 1);
    }

    #[tokio::test]
    async fn test_transfer_to_same_course_is_bad_request() {
        let store = store_with_courses().await;
        let enrollment = store.enroll("STU-1", "CS101").await.unwrap();

        let err = store.transfer(enrollment.id, "CS101").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_course_with_enrollments_is_conflict() {
        let store = store_with_courses().await;
        store.enroll("STU-1", "CS101").await.unwrap();

        let err = store.delete_course("CS101").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Still listed
        assert!(store.get_course("CS101").await.is_ok());
    }

    #[tokio::test]
    async fn test_unenroll_releases_the_seat() {
        let store = store_with_courses().await;
        let enrollment = store.enroll("STU-1", "CS101").await.unwrap();

        store.unenroll(enrollment.id).await.unwrap();
        assert_eq!(store.get_course("CS101").await.unwrap().enrolled, 0);

        let err = store.unenroll(enrollment.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_capacity_cannot_drop_below_enrollment() {
        let store = store_with_courses().await;
        store.enroll("STU-1", "CS101").await.unwrap();
        store.enroll("STU-2", "CS101").await.unwrap();

        let err = store
            .update_course(
                "CS101",
                CourseUpdate {
                    capacity: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unenroll_by_pair() {
        let store = store_with_courses().await;
        store.enroll("STU-1", "CS101").await.unwrap();

        store.unenroll_student("STU-1", "CS101").await.unwrap();
        assert_eq!(store.get_course("CS101").await.unwrap().enrolled, 0);

        let err = store.unenroll_student("STU-1", "CS101").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
