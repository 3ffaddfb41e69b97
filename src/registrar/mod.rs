//! Registrar module - courses and enrollments
//!
//! Both entities live in one store because the transfer operation must
//! retarget an enrollment and adjust two courses' seat counts atomically.

mod models;
mod store;

pub use models::*;
pub use store::RegistrarStore;
