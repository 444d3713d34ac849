//! Infrastructure layer - store implementations and service wiring

pub mod logging;
pub mod store;
pub mod user;
