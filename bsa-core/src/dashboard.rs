//! Dashboard totals

use tokio::sync::watch;
use tracing::debug;

use crate::client::ApiClient;
use crate::models::DashboardStats;
use crate::state::{PayloadKeys, RequestState, StateCell};
use crate::transport::ApiRequest;

const STATS_PATH: &str = "v1/dashboard/stats";

const STATS_KEYS: PayloadKeys = PayloadKeys {
    entity: "stats",
    entities: None,
};

/// Loads product/category/brand totals. The stats live in `entity`.
pub struct DashboardManager {
    client: ApiClient,
    state: StateCell<RequestState<DashboardStats>>,
}

impl DashboardManager {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: StateCell::new(RequestState::default()),
        }
    }

    pub fn state(&self) -> RequestState<DashboardStats> {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState<DashboardStats>> {
        self.state.subscribe()
    }

    /// Current totals, if loaded
    pub fn stats(&self) -> Option<DashboardStats> {
        self.state.snapshot().entity
    }

    pub fn reset_errors(&self) {
        self.state.update(|s| s.reset_errors());
    }

    /// Reload the totals, dropping the previous ones first
    pub async fn refresh(&self) {
        debug!("Loading dashboard stats");
        self.state.update(|s| {
            s.begin();
            s.entity = None;
        });

        let resp = self.client.send(ApiRequest::get(STATS_PATH)).await;
        self.state.update(|s| s.apply(&resp, STATS_KEYS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{sample_session, ScriptedTransport};
    use crate::store::MemorySessionStore;
    use crate::transport::Problem;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (DashboardManager, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemorySessionStore::with_session(sample_session()));
        (DashboardManager::new(ApiClient::new(transport.clone(), store)), transport)
    }

    #[tokio::test]
    async fn test_refresh_loads_stats() {
        let (manager, transport) = setup();
        transport.push(
            200,
            json!({"stats": {"productsTotal": 12, "categoriesTotal": 3, "brandsTotal": 4}}),
        );

        manager.refresh().await;

        assert_eq!(
            manager.stats(),
            Some(DashboardStats {
                products_total: 12,
                categories_total: 3,
                brands_total: 4
            })
        );
        assert!(!manager.state().fetching);
        assert_eq!(transport.requests()[0].path, "v1/dashboard/stats");
    }

    #[tokio::test]
    async fn test_refresh_failure_drops_stats() {
        let (manager, transport) = setup();
        transport.push(
            200,
            json!({"stats": {"productsTotal": 1, "categoriesTotal": 1, "brandsTotal": 1}}),
        );
        transport.push_failure(Problem::TimeoutError);

        manager.refresh().await;
        manager.refresh().await;

        let state = manager.state();
        assert_eq!(state.error.as_deref(), Some("TIMEOUT_ERROR"));
        assert!(state.entity.is_none());
    }
}
