//! Library storage
//!
//! Availability accounting lives here: borrow decrements a book's
//! available copies and return restores them, both inside the write lock
//! that checked them.

use crate::error::AppError;
use crate::library::{Book, BookFilter, BookUpdate, BorrowStatus, Borrowing};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct Shelves {
    books: HashMap<Uuid, Book>,
    borrowings: HashMap<Uuid, Borrowing>,
}

/// Borrowing list filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingFilter {
    pub student_id: Option<String>,
    pub status: Option<BorrowStatus>,
    /// Keep only borrowings overdue as of `today`
    #[serde(default, rename = "overdue")]
    pub overdue_only: bool,
}

/// Thread-safe library store
pub struct LibraryStore {
    inner: RwLock<Shelves>,
    version: AtomicU64,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Shelves::default()),
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
    // BOOKS
    // =========================================================================

    /// Add a book; all copies start available
    pub async fn add_book(&self, mut book: Book) -> Result<Book, AppError> {
        let mut inner = self.inner.write().await;

        book.available_copies = book.total_copies;
        inner.books.insert(book.id, book.clone());
        self.bump();

        Ok(book)
    }

    /// Get a book by id
    pub async fn get_book(&self, id: Uuid) -> Result<Book, AppError> {
        let inner = self.inner.read().await;
        inner
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Copies currently on the shelf, None when the book is unknown
    pub async fn available_copies(&self, id: Uuid) -> Option<u32> {
        let inner = self.inner.read().await;
        inner.books.get(&id).map(|b| b.available_copies)
    }

    /// List books matching the filter, ordered by title
    pub async fn list_books(&self, filter: &BookFilter) -> Vec<Book> {
        let inner = self.inner.read().await;
        let mut books: Vec<Book> = inner
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        books
    }

    /// Overlay provided fields; a total-copies change moves the available
    /// count by the same delta, floored at zero
    pub async fn update_book(&self, id: Uuid, updates: BookUpdate) -> Result<Book, AppError> {
        let mut inner = self.inner.write().await;

        let book = inner
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        if let Some(total) = updates.total_copies {
            let on_loan = book.total_copies - book.available_copies;
            if total < on_loan {
                return Err(AppError::Conflict(format!(
                    "{} copies are on loan, total cannot drop below that",
                    on_loan
                )));
            }
            book.total_copies = total;
            book.available_copies = total - on_loan;
        }
        if let Some(title) = updates.title {
            book.title = title;
        }
        if let Some(author) = updates.author {
            book.author = author;
        }
        if let Some(isbn) = updates.isbn {
            book.isbn = isbn;
        }
        if let Some(category) = updates.category {
            book.category = category;
        }

        book.updated_at = Utc::now();
        let book = book.clone();
        self.bump();

        Ok(book)
    }

    /// Remove a book; refused while copies are out
    pub async fn delete_book(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        if !inner.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        if inner
            .borrowings
            .values()
            .any(|b| b.book_id == id && b.status == BorrowStatus::Borrowed)
        {
            return Err(AppError::Conflict(
                "Book has copies out on loan".to_string(),
            ));
        }

        inner.books.remove(&id);
        self.bump();

        Ok(())
    }

    // =========================================================================
    // BORROWINGS
    // =========================================================================

    /// Lend a copy to a student
    pub async fn borrow(
        &self,
        student_id: &str,
        book_id: Uuid,
        due_date: Option<NaiveDate>,
    ) -> Result<Borrowing, AppError> {
        let mut inner = self.inner.write().await;

        let book = inner
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        if book.available_copies == 0 {
            return Err(AppError::Conflict(format!(
                "No copies of \"{}\" available",
                book.title
            )));
        }

        book.available_copies -= 1;
        book.updated_at = Utc::now();
        let title = book.title.clone();

        let borrowing = Borrowing::new(student_id.to_string(), book_id, due_date);
        inner.borrowings.insert(borrowing.id, borrowing.clone());
        self.bump();

        info!("Lent \"{}\" to {}", title, student_id);
        Ok(borrowing)
    }

    /// Get a borrowing by id
    pub async fn get_borrowing(&self, id: Uuid) -> Result<Borrowing, AppError> {
        let inner = self.inner.read().await;
        inner
            .borrowings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowing {} not found", id)))
    }

    /// Mark a borrowing returned and put the copy back on the shelf
    pub async fn return_borrowing(&self, id: Uuid) -> Result<Borrowing, AppError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let borrowing = inner
            .borrowings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing {} not found", id)))?;

        if borrowing.status == BorrowStatus::Returned {
            return Err(AppError::Conflict(
                "Borrowing was already returned".to_string(),
            ));
        }

        borrowing.status = BorrowStatus::Returned;
        borrowing.returned_at = Some(Utc::now());

        if let Some(book) = inner.books.get_mut(&borrowing.book_id) {
            if book.available_copies < book.total_copies {
                book.available_copies += 1;
            }
            book.updated_at = Utc::now();
        }
        let borrowing = borrowing.clone();
        self.bump();

        Ok(borrowing)
    }

    /// List borrowings matching the filter, newest first
    pub async fn list_borrowings(&self, filter: &BorrowingFilter, today: NaiveDate) -> Vec<Borrowing> {
        let inner = self.inner.read().await;
        let mut borrowings: Vec<Borrowing> = inner
            .borrowings
            .values()
            .filter(|b| {
                filter
                    .student_id
                    .as_deref()
                    .map_or(true, |s| b.student_id == s)
            })
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| !filter.overdue_only || b.is_overdue(today))
            .cloned()
            .collect();
        borrowings.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date).then(b.id.cmp(&a.id)));
        borrowings
    }
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_book(title: &str, copies: u32) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author: "A. Author".to_string(),
            isbn: "978-0000000000".to_string(),
            category: "Fiction".to_string(),
            total_copies: copies,
            available_copies: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_borrow_takes_a_copy() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Dune", 2)).await.unwrap();
        assert_eq!(book.available_copies, 2);

        store.borrow("STU-1", book.id, None).await.unwrap();
        assert_eq!(store.available_copies(book.id).await, Some(1));
    }

    #[tokio::test]
    async fn test_borrow_with_no_copies_is_conflict() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Rare Book", 1)).await.unwrap();
        store.borrow("STU-1", book.id, None).await.unwrap();

        let err = store.borrow("STU-2", book.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.available_copies(book.id).await, Some(0));
    }

    #[tokio::test]
    async fn test_return_restores_availability() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Dune", 1)).await.unwrap();
        let borrowing = store.borrow("STU-1", book.id, None).await.unwrap();

        let returned = store.return_borrowing(borrowing.id).await.unwrap();
        assert_eq!(returned.status, BorrowStatus::Returned);
        assert!(returned.returned_at.is_some());
        assert_eq!(store.available_copies(book.id).await, Some(1));
    }

    #[tokio::test]
    async fn test_double_return_is_conflict() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Dune", 1)).await.unwrap();
        let borrowing = store.borrow("STU-1", book.id, None).await.unwrap();

        store.return_borrowing(borrowing.id).await.unwrap();
        let err = store.return_borrowing(borrowing.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Availability restored exactly once
        assert_eq!(store.available_copies(book.id).await, Some(1));
    }

    #[tokio::test]
    async fn test_overdue_filter() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Dune", 3)).await.unwrap();
        let past_due = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let late = store.borrow("STU-1", book.id, Some(past_due)).await.unwrap();
        let also_late = store.borrow("STU-2", book.id, Some(past_due)).await.unwrap();
        store.return_borrowing(also_late.id).await.unwrap();
        store.borrow("STU-3", book.id, None).await.unwrap();

        let today = Utc::now().date_naive();
        let overdue = store
            .list_borrowings(
                &BorrowingFilter {
                    overdue_only: true,
                    ..Default::default()
                },
                today,
            )
            .await;

        // Returned and not-yet-due borrowings are excluded
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
    }

    #[tokio::test]
    async fn test_delete_book_with_copies_on_loan_is_conflict() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Dune", 1)).await.unwrap();
        let borrowing = store.borrow("STU-1", book.id, None).await.unwrap();

        let err = store.delete_book(book.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        store.return_borrowing(borrowing.id).await.unwrap();
        store.delete_book(book.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_total_copies_cannot_drop_below_on_loan() {
        let store = LibraryStore::new();
        let book = store.add_book(sample_book("Dune", 3)).await.unwrap();
        store.borrow("STU-1", book.id, None).await.unwrap();
        store.borrow("STU-2", book.id, None).await.unwrap();

        let err = store
            .update_book(
                book.id,
                BookUpdate {
                    total_copies: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Shrinking within bounds adjusts availability by the delta
        let updated = store
            .update_book(
                book.id,
                BookUpdate {
                    total_copies: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_copies, 2);
        assert_eq!(updated.available_copies, 0);
    }
}
