//! Portal requests
//!
//! Student-facing asks (borrow a book, enroll, open an account) that
//! wait for an administrator's decision. The payload is a tagged union
//! keyed by `type`, so each variant carries exactly its own fields.

mod models;
mod store;

pub use models::*;
pub use store::RequestStore;
