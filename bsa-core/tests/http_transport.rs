//! End-to-end tests of the reqwest transport against a local fake API

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use bsa_core::{
    ApiClient, CategoryManager, Config, HttpTransport, ListQuery, MemorySessionStore, Problem,
    ProductManager, SessionManager, SessionStore, Transport,
};
use bsa_core::models::CategoryPayload;
use bsa_core::transport::ApiRequest;

fn user() -> Value {
    json!({"name": "Ada", "email": "ada@example.com"})
}

async fn login_handler(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({"accessToken": "stale", "refreshToken": "refresh-1", "user": user()})),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_email_password"})),
        )
    }
}

async fn renew_handler(Path(token): Path<String>) -> (StatusCode, Json<Value>) {
    if token == "refresh-1" {
        (
            StatusCode::OK,
            Json(json!({"accessToken": "fresh", "refreshToken": "refresh-2", "user": user()})),
        )
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_token"})))
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer fresh")
}

async fn category_list_handler(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "session_expired"})));
    }
    (
        StatusCode::OK,
        Json(json!({"categories": [{"_id": "c1", "name": "Tools", "numProducts": 2}]})),
    )
}

async fn category_create_handler(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "session_expired"})));
    }
    (
        StatusCode::OK,
        Json(json!({"category": {"_id": "c9", "name": body["name"]}})),
    )
}

async fn product_list_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: u64 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    Json(json!({
        "products": [],
        "total": 12,
        "limit": limit,
        "currentPage": page
    }))
}

async fn spawn_api() -> SocketAddr {
    let app = Router::new()
        .route("/v1/user/login", post(login_handler))
        .route("/v1/user/renew/{token}", get(renew_handler))
        .route("/v1/category", get(category_list_handler).put(category_create_handler))
        .route("/v1/product", get(product_list_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr, store: Arc<MemorySessionStore>) -> ApiClient {
    let mut config = Config::default();
    config.api.base_url = format!("http://{}", addr);
    config.api.renewal_delay_ms = 10;
    ApiClient::from_config(&config, store).unwrap()
}

#[tokio::test]
async fn test_login_then_renew_and_replay() {
    let addr = spawn_api().await;
    let store = Arc::new(MemorySessionStore::new());
    let client = client_for(addr, store.clone());

    let session = SessionManager::new(client.clone());
    session.login("ada@example.com", "secret").await;
    assert!(session.is_logged_in());
    assert_eq!(store.load().unwrap().unwrap().access_token, "stale");

    // The stale token is rejected, renewed and the list call replayed
    let categories = CategoryManager::new(client.clone());
    categories.list(&ListQuery::new().no_pagination()).await;

    let state = categories.state();
    assert!(state.error.is_none(), "unexpected error: {:?}", state.error);
    let list = state.entities.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].num_products, Some(2));

    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token, "refresh-2");

    // Later writes go straight through with the renewed token
    categories
        .create(&CategoryPayload {
            id: None,
            name: "Garden".to_string(),
            description: None,
        })
        .await;
    assert_eq!(categories.state().entity.unwrap().id, "c9");
}

#[tokio::test]
async fn test_failed_login_reports_code() {
    let addr = spawn_api().await;
    let store = Arc::new(MemorySessionStore::new());
    let session = SessionManager::new(client_for(addr, store.clone()));

    session.login("ada@example.com", "nope").await;

    let state = session.state();
    assert!(!state.logged_in);
    assert_eq!(state.error.as_deref(), Some("invalid_email_password"));
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_query_parameters_and_pagination() {
    let addr = spawn_api().await;
    let products = ProductManager::new(client_for(addr, Arc::new(MemorySessionStore::new())));

    products.list(&ListQuery::new().limit(5).page(2)).await;

    let pagination = products.state().pagination.unwrap();
    assert_eq!(pagination.current_page, 2);
    assert_eq!(pagination.limit, 5);
    assert_eq!(pagination.page_count(), 3);
}

#[tokio::test]
async fn test_unreachable_server_is_a_problem_not_an_error() {
    let transport = HttpTransport::new("http://127.0.0.1:1", None).unwrap();
    let resp = transport.execute(ApiRequest::get("v1/category")).await;

    assert!(!resp.ok);
    assert_eq!(resp.status, None);
    assert_eq!(resp.problem, Problem::ConnectionError);
}
