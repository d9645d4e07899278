use std::time::Instant;

use crate::dashboard::Dashboard;

/// Shared state handed to every request handler.
pub struct AppState {
    pub dashboard: Dashboard,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            started_at: Instant::now(),
        }
    }
}
