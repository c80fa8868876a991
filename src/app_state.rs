use std::sync::Arc;

use crate::services::credentials::CredentialPool;
use crate::services::orchestrator::Orchestrator;
use crate::services::registry::JobRegistry;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub credentials: Arc<CredentialPool>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(
        registry: Arc<JobRegistry>,
        credentials: Arc<CredentialPool>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            registry,
            credentials,
            orchestrator,
        }
    }
}
