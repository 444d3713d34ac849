//! Application state for shared services

use std::sync::Arc;

use crate::domain::UserStore;
use crate::infrastructure::user::UserService;

/// Shared state: the user service over whichever store was configured.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            users: Arc::new(UserService::new(store)),
        }
    }
}
