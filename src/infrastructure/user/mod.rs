//! User service

mod service;

pub use service::{UserService, MAX_SEARCH_RESULTS};
