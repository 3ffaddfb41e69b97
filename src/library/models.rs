//! Library data models

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard lending period
pub const BORROW_PERIOD_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub total_copies: u32,
    /// Maintained by the store as copies go out and come back
    pub available_copies: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial book update, only provided fields overlay
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub total_copies: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Borrowing {
    pub id: Uuid,
    pub student_id: String,
    pub book_id: Uuid,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BorrowStatus,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Borrowing {
    pub fn new(student_id: String, book_id: Uuid, due_date: Option<NaiveDate>) -> Self {
        let today = Utc::now().date_naive();
        Self {
            id: Uuid::new_v4(),
            student_id,
            book_id,
            borrow_date: today,
            due_date: due_date.unwrap_or(today + Duration::days(BORROW_PERIOD_DAYS)),
            status: BorrowStatus::Borrowed,
            returned_at: None,
        }
    }

    /// Computed at response time, never persisted
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == BorrowStatus::Borrowed && self.due_date < today
    }
}

/// Book list filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFilter {
    /// Case-insensitive substring over title, author and isbn
    pub search: Option<String>,
    pub category: Option<String>,
}

impl BookFilter {
    pub(crate) fn matches(&self, book: &Book) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            book.title.to_lowercase().contains(&q)
                || book.author.to_lowercase().contains(&q)
                || book.isbn.to_lowercase().contains(&q)
        });
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| book.category.eq_ignore_ascii_case(c));

        search_ok && category_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overdue_requires_past_due_and_borrowed() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut borrowing = Borrowing::new("STU-1".to_string(), Uuid::new_v4(), None);
        borrowing.due_date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        assert!(borrowing.is_overdue(today));

        borrowing.status = BorrowStatus::Returned;
        assert!(!borrowing.is_overdue(today));
    }

    #[test]
    fn test_due_date_defaults_to_borrow_period() {
        let borrowing = Borrowing::new("STU-1".to_string(), Uuid::new_v4(), None);
        assert_eq!(
            borrowing.due_date - borrowing.borrow_date,
            Duration::days(BORROW_PERIOD_DAYS)
        );
    }
}
