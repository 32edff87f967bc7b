//! Request lifecycle state shared by every data manager
//!
//! A manager owns one [`RequestState`] inside a [`StateCell`]. Operations
//! mark it fetching, then fold the response envelope back in: on success
//! only the keys present in the payload are merged, on failure the error is
//! recorded and previously loaded data is left alone.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::transport::ApiResponse;

/// Error code for a successful response whose payload could not be decoded
pub const INVALID_RESPONSE: &str = "invalid_response";

/// Server-side pagination of a list call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub current_page: u64,
}

impl Pagination {
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 1;
        }
        self.total.div_ceil(self.limit).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count()
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

/// In-flight and result bookkeeping for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub fetching: bool,
    pub error: Option<String>,
    pub error_objects: Option<Vec<String>>,
    pub entity: Option<T>,
    pub entities: Option<Vec<T>>,
    pub deleted_id: Option<String>,
    pub pagination: Option<Pagination>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            fetching: false,
            error: None,
            error_objects: None,
            entity: None,
            entities: None,
            deleted_id: None,
            pagination: None,
        }
    }
}

/// Payload keys a manager reads its records from
#[derive(Debug, Clone, Copy)]
pub struct PayloadKeys {
    /// Single record, e.g. `category`
    pub entity: &'static str,
    /// Collection, e.g. `categories`
    pub entities: Option<&'static str>,
}

/// The parts of a success payload that were present
struct Update<T> {
    entity: Option<T>,
    entities: Option<Vec<T>>,
    deleted_id: Option<String>,
    pagination: Option<Pagination>,
}

impl<T: DeserializeOwned> RequestState<T> {
    /// Start a request cycle: fetching on, errors cleared
    pub fn begin(&mut self) {
        self.fetching = true;
        self.error = None;
        self.error_objects = None;
    }

    pub fn reset_errors(&mut self) {
        self.error = None;
        self.error_objects = None;
    }

    /// Finish a cycle with a local failure that never reached the server
    pub fn fail(&mut self, code: impl Into<String>) {
        self.fetching = false;
        self.error = Some(code.into());
        self.error_objects = None;
    }

    /// Fold a response envelope into the state
    pub fn apply(&mut self, response: &ApiResponse, keys: PayloadKeys) {
        if !response.ok {
            self.fetching = false;
            match response.error_code() {
                Some(code) => {
                    self.error = Some(code.to_string());
                    self.error_objects = response.error_objects();
                }
                None => {
                    self.error = Some(response.problem.to_string());
                    self.error_objects = None;
                }
            }
            return;
        }

        let update = match decode_update::<T>(response.data.as_ref(), keys) {
            Ok(update) => update,
            Err(e) => {
                warn!(path = %response.request.path, "Undecodable payload: {}", e);
                self.fail(INVALID_RESPONSE);
                return;
            }
        };

        self.fetching = false;
        self.error = None;
        self.error_objects = None;

        if let Some(entity) = update.entity {
            self.entity = Some(entity);
        }
        if let Some(entities) = update.entities {
            self.entities = Some(entities);
        }
        if let Some(deleted_id) = update.deleted_id {
            self.deleted_id = Some(deleted_id);
        }
        if let Some(pagination) = update.pagination {
            self.pagination = Some(pagination);
        }
    }
}

fn decode_update<T: DeserializeOwned>(
    data: Option<&Value>,
    keys: PayloadKeys,
) -> Result<Update<T>, serde_json::Error> {
    let field = |key: &str| data.and_then(|d| d.get(key)).filter(|v| !v.is_null());

    let entity = field(keys.entity)
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?;

    let entities = keys
        .entities
        .and_then(field)
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?;

    let deleted_id = field("deletedId").and_then(id_string);

    // A truthy currentPage marks a paginated listing
    let pagination = field("currentPage")
        .and_then(as_count)
        .filter(|page| *page > 0)
        .map(|current_page| Pagination {
            total: field("total").and_then(as_count).unwrap_or(0),
            limit: field("limit").and_then(as_count).unwrap_or(0),
            current_page,
        });

    Ok(Update {
        entity,
        entities,
        deleted_id,
        pagination,
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Observable holder of a manager's state
pub struct StateCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Mutate the state and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }
}
