use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::engine::ScoringEngine;
use crate::roster::InMemoryRoster;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    /// Team sheets; the engine reads the same roster.
    pub roster: Arc<InMemoryRoster>,
    pub heartbeat: Duration,
}

impl AppState {
    pub fn new(config: &ServiceConfig) -> Self {
        let roster = Arc::new(InMemoryRoster::new());
        let engine = ScoringEngine::from_config(config, roster.clone());
        Self {
            engine: Arc::new(engine),
            roster,
            heartbeat: Duration::from_secs(config.hub.heartbeat_interval_secs.max(1)),
        }
    }
}
