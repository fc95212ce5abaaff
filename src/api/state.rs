//! Shared state passed to all API handlers

use std::sync::Arc;

use crate::alerts::actor::AlertHandle;
use crate::cache::ResponseCache;
use crate::ingest::IngestionCoordinator;
use crate::query::QueryService;
use crate::store::MetricStore;

#[derive(Clone)]
pub struct ApiState {
    /// Write path: validate, persist, detect, invalidate, notify
    pub coordinator: Arc<IngestionCoordinator>,

    /// Read path: cache-backed views
    pub query: Arc<QueryService>,

    /// Direct store access for deletes, updates and health checks
    pub store: Arc<dyn MetricStore>,

    /// Shared response cache; delete handlers invalidate through it
    pub cache: Arc<ResponseCache>,

    /// Handle to the alert actor for stats and mute control
    pub alerts: AlertHandle,
}

impl ApiState {
    pub fn new(
        coordinator: Arc<IngestionCoordinator>,
        query: Arc<QueryService>,
        store: Arc<dyn MetricStore>,
        cache: Arc<ResponseCache>,
        alerts: AlertHandle,
    ) -> Self {
        Self {
            coordinator,
            query,
            store,
            cache,
            alerts,
        }
    }
}
