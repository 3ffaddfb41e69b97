//! Library module - books and borrowings
//!
//! Grouped in one store so borrow and return adjust a book's available
//! copies under the same lock that checks them.

mod models;
mod store;

pub use models::*;
pub use store::{BorrowingFilter, LibraryStore};
