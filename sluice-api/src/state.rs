//! Shared application state handed to every handler

use std::sync::Arc;

use crate::config::Config;
use crate::event::EventPublisher;
use crate::repository::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub events: Arc<dyn EventPublisher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventPublisher>, config: Config) -> Self {
        Self {
            store,
            events,
            config: Arc::new(config),
        }
    }
}
