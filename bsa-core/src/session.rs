//! Session manager: login, registration and logout
//!
//! Owns the persisted [`Session`]. Construction restores a stored session
//! synchronously, so a restarted client is logged in without a network
//! round-trip.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::models::{Session, User};
use crate::state::{StateCell, INVALID_RESPONSE};
use crate::store::SessionStore;
use crate::transport::{ApiRequest, ApiResponse};

/// Error code when the session could not be persisted
pub const STORAGE_ERROR: &str = "storage_error";

/// Authentication state exposed to the views
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub logged_in: bool,
    pub fetching: bool,
    pub error: Option<String>,
    pub error_objects: Option<Vec<String>>,
    pub access_token: String,
    pub refresh_token: String,
    pub user: Option<User>,
}

impl AuthState {
    fn hydrate(&mut self, session: Session) {
        self.logged_in = true;
        self.access_token = session.access_token;
        self.refresh_token = session.refresh_token;
        self.user = session.user;
    }
}

/// Single session service shared by the whole client
pub struct SessionManager {
    client: ApiClient,
    store: Arc<dyn SessionStore>,
    state: StateCell<AuthState>,
}

impl SessionManager {
    /// Create the manager, restoring any persisted session
    pub fn new(client: ApiClient) -> Self {
        let store = Arc::clone(client.store());
        let mut state = AuthState::default();

        match store.load() {
            Ok(Some(session)) => {
                debug!("Restored persisted session");
                state.hydrate(session);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to load session: {}", e),
        }

        Self {
            client,
            store,
            state: StateCell::new(state),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.snapshot().logged_in
    }

    pub fn reset_errors(&self) {
        self.state.update(|s| {
            s.error = None;
            s.error_objects = None;
        });
    }

    /// `POST v1/user/login`
    pub async fn login(&self, email: &str, password: &str) {
        debug!("Logging in");
        self.begin();
        let request = ApiRequest::post("v1/user/login").json(json!({
            "email": email,
            "password": password,
        }));
        let resp = self.client.send(request).await;
        self.finish(&resp);
    }

    /// `PUT v1/user/register`
    pub async fn register(&self, name: &str, email: &str, password: &str) {
        debug!("Registering account");
        self.begin();
        let request = ApiRequest::put("v1/user/register").json(json!({
            "name": name,
            "email": email,
            "password": password,
        }));
        let resp = self.client.send(request).await;
        self.finish(&resp);
    }

    /// Follow the persisted session after calls made elsewhere.
    ///
    /// Token renewal replaces the stored session and a failed renewal
    /// erases it; either change is mirrored into the state here.
    pub fn sync(&self) {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to load session: {}", e);
                return;
            }
        };

        self.state.update(|s| match stored {
            Some(session) if s.logged_in => {
                if s.access_token != session.access_token
                    || s.refresh_token != session.refresh_token
                {
                    debug!("Session renewed");
                }
                s.hydrate(session);
            }
            None if s.logged_in => {
                info!("Session ended");
                *s = AuthState::default();
            }
            _ => {}
        });
    }

    /// Drop the session locally and in storage. No network call.
    pub fn logout(&self) {
        self.state.update(|s| {
            *s = AuthState::default();
        });

        if let Err(e) = self.store.clear() {
            warn!("Failed to clear session: {}", e);
        }
        info!("Logged out");
    }

    fn begin(&self) {
        self.state.update(|s| {
            s.fetching = true;
            s.error = None;
            s.error_objects = None;
        });
    }

    fn finish(&self, resp: &ApiResponse) {
        if !resp.ok {
            let (error, objects) = match resp.error_code() {
                Some(code) => (code.to_string(), resp.error_objects()),
                None => (resp.problem.to_string(), None),
            };
            debug!(status = ?resp.status, %error, "Authentication failed");
            self.state.update(|s| {
                s.fetching = false;
                s.error = Some(error);
                s.error_objects = objects;
            });
            return;
        }

        let session = match resp.data.clone().map(serde_json::from_value::<Session>) {
            Some(Ok(session)) => session,
            other => {
                if let Some(Err(e)) = other {
                    warn!("Malformed session payload: {}", e);
                }
                self.fail(INVALID_RESPONSE);
                return;
            }
        };

        if let Err(e) = self.store.save(&session) {
            warn!("Failed to persist session: {}", e);
            self.fail(STORAGE_ERROR);
            return;
        }

        info!("Session established");
        self.state.update(|s| {
            s.fetching = false;
            s.error = None;
            s.error_objects = None;
            s.hydrate(session);
        });
    }

    fn fail(&self, code: &str) {
        self.state.update(|s| {
            s.fetching = false;
            s.error = Some(code.to_string());
            s.error_objects = None;
        });
    }
}
