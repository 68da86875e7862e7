use std::sync::Arc;

use verbo_srs::{RecordStore, SrsEngine};

use crate::{ApiConfig, config::Environment};

/// Shared handler state. Cloning is cheap; every clone drives the same engine.
pub struct ApiState<S> {
    pub engine: Arc<SrsEngine<S>>,
    pub environment: Environment,
}

impl<S: RecordStore> ApiState<S> {
    pub fn new(store: S, config: &ApiConfig) -> Self {
        Self {
            engine: Arc::new(SrsEngine::new(store, config.engine.clone())),
            environment: config.env,
        }
    }
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            environment: self.environment,
        }
    }
}
