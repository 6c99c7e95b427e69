use std::sync::Arc;

use crate::config::Settings;
use crate::services::{
    jobs::JobGateway,
    queue::Broker,
    registry::ProviderRegistry,
    store::ResultStore,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<ProviderRegistry>,
    pub gateway: Arc<JobGateway>,
    pub broker: Arc<dyn Broker>,
    pub store: Arc<dyn ResultStore>,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        registry: Arc<ProviderRegistry>,
        broker: Arc<dyn Broker>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        let gateway = JobGateway::new(
            store.clone(),
            broker.clone(),
            registry.clone(),
            settings.clone(),
        );
        Self {
            settings,
            registry,
            gateway: Arc::new(gateway),
            broker,
            store,
        }
    }
}
