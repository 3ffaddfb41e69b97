//! Library route handlers
//!
//! Books and borrowings. The `overdue` flag on borrowing responses is
//! computed against today's date when the response is built.

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::library::{Book, BookFilter, BookUpdate, Borrowing, BorrowingFilter};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// BOOKS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10 to 17 characters"))]
    pub isbn: String,
    pub category: Option<String>,
    #[validate(range(min = 1, message = "At least one copy is required"))]
    pub total_copies: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListResponse {
    pub books: Vec<Book>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/books
pub async fn create_book(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Book>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let book = state
        .library
        .add_book(Book {
            id: Uuid::new_v4(),
            title: payload.title,
            author: payload.author,
            isbn: payload.isbn,
            category: payload.category.unwrap_or_else(|| "General".to_string()),
            total_copies: payload.total_copies,
            available_copies: payload.total_copies,
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Created,
            "book",
            Some(book.id.to_string()),
            None,
        ))
        .await;

    info!("Added book \"{}\"", book.title);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Book added successfully.", book)),
    ))
}

/// GET /api/books
pub async fn list_books(
    State(state): State<SharedState>,
    Query(filter): Query<BookFilter>,
) -> ApiResult<Json<SuccessResponse<BookListResponse>>> {
    let books = state.library.list_books(&filter).await;
    let version = state.library.version();
    let count = books.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} book(s).", count),
        BookListResponse {
            books,
            count,
            version,
        },
    )))
}

/// GET /api/books/{id}
pub async fn get_book(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Book>>> {
    let book = state.library.get_book(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Book retrieved successfully.",
        book,
    )))
}

/// PUT /api/books/{id}
pub async fn update_book(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<BookUpdate>,
) -> ApiResult<Json<SuccessResponse<Book>>> {
    let book = state.library.update_book(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "book",
            Some(book.id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Book updated successfully.",
        book,
    )))
}

/// DELETE /api/books/{id}
pub async fn delete_book(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.library.delete_book(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "book",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("Book deleted successfully.")))
}

// =============================================================================
// BORROWINGS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BorrowBookRequest {
    #[validate(length(min = 1, message = "Student ID is required"))]
    pub student_id: String,
    pub book_id: Uuid,
    /// Defaults to fourteen days from today
    pub due_date: Option<NaiveDate>,
}

/// A borrowing plus its derived overdue flag
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingView {
    #[serde(flatten)]
    pub borrowing: Borrowing,
    pub overdue: bool,
}

impl BorrowingView {
    fn build(borrowing: Borrowing, today: NaiveDate) -> Self {
        let overdue = borrowing.is_overdue(today);
        BorrowingView { borrowing, overdue }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingListResponse {
    pub borrowings: Vec<BorrowingView>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/borrowings
pub async fn create_borrowing(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BorrowBookRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<BorrowingView>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let borrowing = state
        .library
        .borrow(&payload.student_id, payload.book_id, payload.due_date)
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Borrowed,
            "borrowing",
            Some(borrowing.id.to_string()),
            Some(json!({
                "studentId": borrowing.student_id,
                "bookId": borrowing.book_id,
            })),
        ))
        .await;

    let today = Utc::now().date_naive();
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Book borrowed successfully.",
            BorrowingView::build(borrowing, today),
        )),
    ))
}

/// GET /api/borrowings
pub async fn list_borrowings(
    State(state): State<SharedState>,
    Query(filter): Query<BorrowingFilter>,
) -> ApiResult<Json<SuccessResponse<BorrowingListResponse>>> {
    let today = Utc::now().date_naive();
    let borrowings = state.library.list_borrowings(&filter, today).await;
    let version = state.library.version();
    let count = borrowings.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} borrowing(s).", count),
        BorrowingListResponse {
            borrowings: borrowings
                .into_iter()
                .map(|b| BorrowingView::build(b, today))
                .collect(),
            count,
            version,
        },
    )))
}

/// GET /api/borrowings/{id}
pub async fn get_borrowing(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<BorrowingView>>> {
    let borrowing = state.library.get_borrowing(id).await?;
    let today = Utc::now().date_naive();

    Ok(Json(SuccessResponse::with_data(
        "Borrowing retrieved successfully.",
        BorrowingView::build(borrowing, today),
    )))
}

/// POST /api/borrowings/{id}/return
pub async fn return_borrowing(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<BorrowingView>>> {
    let borrowing = state.library.return_borrowing(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Returned,
            "borrowing",
            Some(borrowing.id.to_string()),
            None,
        ))
        .await;

    let today = Utc::now().date_naive();
    Ok(Json(SuccessResponse::with_data(
        "Book returned successfully.",
        BorrowingView::build(borrowing, today),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::BorrowStatus;

    #[test]
    fn test_borrowing_view_wire_shape() {
        let borrowing = Borrowing::new("STU-1024".to_string(), Uuid::new_v4(), None);
        let due = borrowing.due_date;

        let stale = BorrowingView::build(borrowing.clone(), due + chrono::Duration::days(1));
        assert!(stale.overdue);

        let json = serde_json::to_value(&stale).unwrap();
        assert_eq!(json["studentId"], "STU-1024");
        assert_eq!(json["status"], "borrowed");
        assert_eq!(json["overdue"], true);

        let mut returned = borrowing;
        returned.status = BorrowStatus::Returned;
        let view = BorrowingView::build(returned, due + chrono::Duration::days(1));
        assert!(!view.overdue);
    }
}
