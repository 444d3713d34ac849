//! Domain layer - core types, validation, and the store abstraction

pub mod error;
pub mod user;

pub use error::DomainError;
pub use user::{Document, UserStore};
