use crate::config::AppConfig;
use crate::mailer::{Mailer, TransportFactory};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub mailer: Arc<Mailer>,
    pub started_at: Instant,
    pub registry: Registry,
}

impl AppState {
    pub fn new(config: AppConfig, factory: Arc<dyn TransportFactory>, registry: Registry) -> Self {
        let mailer = Mailer::new(config.smtp.clone(), factory);
        Self {
            config: Arc::new(config),
            mailer: Arc::new(mailer),
            started_at: Instant::now(),
            registry,
        }
    }
}
