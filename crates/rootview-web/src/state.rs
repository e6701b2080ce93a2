use std::sync::Arc;

use rootview_core::Browser;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub browser: Arc<Browser>,
}

impl AppState {
    pub fn new(config: ServerConfig, browser: Browser) -> Self {
        Self {
            config: Arc::new(config),
            browser: Arc::new(browser),
        }
    }
}
