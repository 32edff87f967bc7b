//! Generic CRUD manager, instantiated per resource
//!
//! Each operation follows the same cycle: mark the state fetching (resetting
//! the fields that operation is about to produce), send the request through
//! the [`ApiClient`], then fold the envelope back into the state.
//!
//! Wire verbs follow the API, which creates with PUT and updates with POST:
//!
//! | op | verb | path |
//! |---|---|---|
//! | list | GET | `v1/{resource}` |
//! | detail | GET | `v1/{resource}/{id}` |
//! | create | PUT | `v1/{resource}` |
//! | update | POST | `v1/{resource}/{id}` |
//! | delete | DELETE | `v1/{resource}/{id}` |
//!
//! Calls on one manager share a single `fetching` flag and are not
//! sequenced: whichever response arrives last wins.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::models::{
    Brand, BrandPayload, Category, CategoryPayload, ListQuery, Product, ProductPayload,
    WritePayload,
};
use crate::state::{PayloadKeys, RequestState, StateCell};
use crate::transport::{ApiRequest, ApiResponse};

/// Error code for an update whose payload carries no id
pub const MISSING_ID: &str = "missing_id";

/// Error code for a payload that could not be serialized
pub const INVALID_PAYLOAD: &str = "invalid_payload";

/// A REST resource managed through [`ResourceManager`]
pub trait Resource: Send + Sync + 'static {
    type Entity: DeserializeOwned + Clone + Send + Sync + 'static;
    type Payload: WritePayload;

    /// Collection path, e.g. `v1/category`
    const PATH: &'static str;

    /// Payload keys for one record and for the collection
    const KEYS: PayloadKeys;
}

pub struct CategoryResource;
pub struct BrandResource;
pub struct ProductResource;

impl Resource for CategoryResource {
    type Entity = Category;
    type Payload = CategoryPayload;
    const PATH: &'static str = "v1/category";
    const KEYS: PayloadKeys = PayloadKeys {
        entity: "category",
        entities: Some("categories"),
    };
}

impl Resource for BrandResource {
    type Entity = Brand;
    type Payload = BrandPayload;
    const PATH: &'static str = "v1/brand";
    const KEYS: PayloadKeys = PayloadKeys {
        entity: "brand",
        entities: Some("brands"),
    };
}

impl Resource for ProductResource {
    type Entity = Product;
    type Payload = ProductPayload;
    const PATH: &'static str = "v1/product";
    const KEYS: PayloadKeys = PayloadKeys {
        entity: "product",
        entities: Some("products"),
    };
}

pub type CategoryManager = ResourceManager<CategoryResource>;
pub type BrandManager = ResourceManager<BrandResource>;
pub type ProductManager = ResourceManager<ProductResource>;

/// List/detail/create/update/delete state machine for one resource
pub struct ResourceManager<R: Resource> {
    client: ApiClient,
    state: StateCell<RequestState<R::Entity>>,
    _resource: PhantomData<R>,
}

impl<R: Resource> ResourceManager<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: StateCell::new(RequestState::default()),
            _resource: PhantomData,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> RequestState<R::Entity> {
        self.state.snapshot()
    }

    /// Receiver notified on every state transition
    pub fn subscribe(&self) -> watch::Receiver<RequestState<R::Entity>> {
        self.state.subscribe()
    }

    pub fn reset_errors(&self) {
        self.state.update(|s| s.reset_errors());
    }

    /// Load the collection. Clears the current record and deleted id.
    pub async fn list(&self, query: &ListQuery) {
        debug!(path = R::PATH, ?query, "list");
        self.state.update(|s| {
            s.begin();
            s.entity = None;
            s.deleted_id = None;
        });

        let resp = self.client.send(ApiRequest::get(R::PATH).query(query)).await;
        self.finish(&resp);
    }

    /// Load one record
    pub async fn detail(&self, id: &str) {
        debug!(path = R::PATH, id, "detail");
        self.state.update(|s| s.begin());

        let resp = self.client.send(ApiRequest::get(record_path::<R>(id))).await;
        self.finish(&resp);
    }

    /// Create a record. On success `entity` holds the created record.
    pub async fn create(&self, payload: &R::Payload) {
        debug!(path = R::PATH, "create");
        self.state.update(|s| {
            s.begin();
            s.entity = None;
        });

        let Some(body) = self.encode(payload) else {
            return;
        };
        let resp = self.client.send(ApiRequest::put(R::PATH).json(body)).await;
        self.finish(&resp);
    }

    /// Update the record named by `payload`'s id
    pub async fn update(&self, payload: &R::Payload) {
        self.state.update(|s| {
            s.begin();
            s.entity = None;
        });

        let Some(id) = payload.id().filter(|id| !id.is_empty()) else {
            warn!(path = R::PATH, "Update without id");
            self.state.update(|s| s.fail(MISSING_ID));
            return;
        };
        debug!(path = R::PATH, id, "update");

        let Some(body) = self.encode(payload) else {
            return;
        };
        let resp = self
            .client
            .send(ApiRequest::post(record_path::<R>(id)).json(body))
            .await;
        self.finish(&resp);
    }

    /// Delete a record. On success `deleted_id` holds its id.
    pub async fn delete(&self, id: &str) {
        debug!(path = R::PATH, id, "delete");
        self.state.update(|s| {
            s.begin();
            s.deleted_id = None;
        });

        let resp = self
            .client
            .send(ApiRequest::delete(record_path::<R>(id)))
            .await;
        self.finish(&resp);
    }

    fn encode(&self, payload: &R::Payload) -> Option<serde_json::Value> {
        match serde_json::to_value(payload) {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(path = R::PATH, "Failed to encode payload: {}", e);
                self.state.update(|s| s.fail(INVALID_PAYLOAD));
                None
            }
        }
    }

    fn finish(&self, resp: &ApiResponse) {
        self.state.update(|s| s.apply(resp, R::KEYS));
    }
}

fn record_path<R: Resource>(id: &str) -> String {
    format!("{}/{}", R::PATH, id)
}
