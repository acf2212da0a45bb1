//! Application state shared by the handlers

use std::sync::Arc;

use crate::domain::cache::Cache;
use crate::domain::clock::SharedClock;
use crate::domain::credential::CredentialDirectory;
use crate::domain::denylist::DenylistRepository;
use crate::infrastructure::gateway::{BlacklistService, CacheSyncEngine, MetricsAggregator};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BlacklistService>,
    pub sync: Arc<CacheSyncEngine>,
    pub aggregator: Arc<MetricsAggregator>,
    pub cache: Arc<dyn Cache>,
    pub directory: Arc<dyn CredentialDirectory>,
    pub repository: Arc<dyn DenylistRepository>,
    pub clock: SharedClock,
    /// Bearer token for the admin routes; `None` disables them
    pub admin_token: Option<Arc<str>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("admin_enabled", &self.admin_token.is_some())
            .finish_non_exhaustive()
    }
}
