//! Silent access token renewal
//!
//! When the API rejects a request with `403 {"error": "session_expired"}`,
//! the stored refresh token is exchanged for a new session once and the
//! original request is replayed with the new access token. A failed
//! renewal erases the stored session, forcing a fresh login.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{Interception, Interceptor};
use crate::models::Session;
use crate::store::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Error code the API uses for an expired access token
pub const SESSION_EXPIRED: &str = "session_expired";

/// `GET v1/user/renew/{refreshToken}`
pub fn renew_request(refresh_token: &str) -> ApiRequest {
    ApiRequest::get(format!("v1/user/renew/{}", refresh_token))
}

/// Whether a response signals an expired access token
pub fn is_session_expired(response: &ApiResponse) -> bool {
    !response.ok
        && response.status == Some(403)
        && response.data.as_ref().is_some_and(|d| d.is_object())
        && response.error_code() == Some(SESSION_EXPIRED)
}

/// Interceptor renewing the access token on session expiry
pub struct TokenRenewal {
    store: Arc<dyn SessionStore>,
}

impl TokenRenewal {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    fn stored_refresh_token(&self) -> Option<String> {
        match self.store.load() {
            Ok(Some(session)) if session.has_refresh_token() => Some(session.refresh_token),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read session for renewal: {}", e);
                None
            }
        }
    }

    /// Clear the session, unless a concurrent renewal already replaced the
    /// refresh token that was just rejected. In that case the request is
    /// replayed with the newer access token instead.
    fn renewal_failed(&self, used_refresh_token: &str, response: &ApiResponse) -> Interception {
        match self.store.load() {
            Ok(Some(current)) if current.refresh_token != used_refresh_token => {
                debug!(path = %response.request.path, "Session renewed concurrently, replaying");
                Interception::Retry(response.request.clone().bearer_token(&current.access_token))
            }
            Ok(None) => Interception::PassThrough,
            _ => {
                warn!("Clearing session after failed renewal");
                if let Err(e) = self.store.clear() {
                    warn!("Failed to clear session: {}", e);
                }
                Interception::PassThrough
            }
        }
    }
}

#[async_trait]
impl Interceptor for TokenRenewal {
    async fn intercept(&self, transport: &dyn Transport, response: &ApiResponse) -> Interception {
        if !is_session_expired(response) {
            return Interception::PassThrough;
        }

        let Some(refresh_token) = self.stored_refresh_token() else {
            debug!(path = %response.request.path, "Session expired without refresh token");
            return Interception::PassThrough;
        };

        let renewal = transport.execute(renew_request(&refresh_token)).await;
        if !renewal.ok {
            warn!(status = ?renewal.status, problem = %renewal.problem, "Token renewal failed");
            return self.renewal_failed(&refresh_token, response);
        }

        let session = match renewal.data.map(serde_json::from_value::<Session>) {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                warn!("Malformed renewal response: {}", e);
                return self.renewal_failed(&refresh_token, response);
            }
            None => {
                warn!("Empty renewal response");
                return self.renewal_failed(&refresh_token, response);
            }
        };

        if let Err(e) = self.store.save(&session) {
            warn!("Failed to persist renewed session: {}", e);
            return Interception::PassThrough;
        }

        info!(path = %response.request.path, "Access token renewed");
        Interception::Retry(response.request.clone().bearer_token(&session.access_token))
    }
}
