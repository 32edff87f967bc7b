//! API client: bearer authorization plus an interceptor chain over a transport
//!
//! Interceptors see every response. Each one either lets it pass or asks
//! for the request to be replayed with replacement credentials; a call is
//! replayed at most once, and the replayed response is what the caller gets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::renewal::TokenRenewal;
use crate::store::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Outcome of offering a response to an interceptor
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Leave the response as it is
    PassThrough,
    /// Replay this request (usually the original with new credentials)
    Retry(ApiRequest),
}

/// Observer attached to every transport response
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Inspect a response. `transport` is the raw transport, so any calls the
    /// interceptor makes itself bypass the chain.
    async fn intercept(&self, transport: &dyn Transport, response: &ApiResponse) -> Interception;
}

/// Shared handle used by every manager to reach the API
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    replay_delay: Duration,
}

impl ApiClient {
    /// Client without interceptors
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            transport,
            store,
            interceptors: Vec::new(),
            replay_delay: Duration::ZERO,
        }
    }

    /// HTTP client for the configured API with token renewal installed
    pub fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Result<Self, reqwest::Error> {
        let transport = HttpTransport::new(&config.api.base_url, config.api.timeout())?;
        info!("API endpoint: {}", transport.base_url());

        Ok(Self::new(Arc::new(transport), Arc::clone(&store))
            .with_interceptor(Arc::new(TokenRenewal::new(store)))
            .with_replay_delay(config.api.renewal_delay()))
    }

    /// Append an interceptor; they run in insertion order
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Delay before a replay, giving session persistence time to settle
    pub fn with_replay_delay(mut self, delay: Duration) -> Self {
        self.replay_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Send a request through the interceptor chain
    pub async fn send(&self, request: ApiRequest) -> ApiResponse {
        let request = self.authorize(request);
        let response = self.transport.execute(request).await;

        for interceptor in &self.interceptors {
            match interceptor.intercept(self.transport.as_ref(), &response).await {
                Interception::PassThrough => {}
                Interception::Retry(replay) => {
                    if !self.replay_delay.is_zero() {
                        tokio::time::sleep(self.replay_delay).await;
                    }
                    info!(method = %replay.method, path = %replay.path, "Replaying request");
                    return self.transport.execute(replay).await;
                }
            }
        }

        response
    }

    /// Attach the stored access token unless the request already carries one
    fn authorize(&self, request: ApiRequest) -> ApiRequest {
        if request.header_value("Authorization").is_some() {
            return request;
        }

        match self.store.access_token() {
            Some(token) => request.bearer_token(&token),
            None => {
                debug!(path = %request.path, "No access token, sending unauthenticated");
                request
            }
        }
    }
}
