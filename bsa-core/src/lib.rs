//! bsa-core: Client library for the BSA admin API
//!
//! This crate provides:
//! - Persisted session store (tokens + user)
//! - HTTP transport with a uniform response envelope
//! - Token renewal interceptor
//! - Session manager (login, register, logout)
//! - Generic resource manager for categories, brands and products
//! - Dashboard stats manager

pub mod client;
pub mod config;
pub mod dashboard;
pub mod messages;
pub mod models;
pub mod renewal;
pub mod resource;
pub mod session;
pub mod state;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ApiClient, Interception, Interceptor};
pub use config::Config;
pub use dashboard::DashboardManager;
pub use messages::describe_error;
pub use models::{Brand, Category, DashboardStats, ListQuery, Product, Session, User};
pub use renewal::TokenRenewal;
pub use resource::{BrandManager, CategoryManager, ProductManager, Resource, ResourceManager};
pub use session::{AuthState, SessionManager};
pub use state::{Pagination, RequestState};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Problem, Transport};

/// Default API base URL when no config is present
pub const DEFAULT_API_URL: &str = "http://localhost:3000/";

/// Storage key of the persisted session blob
pub const STORAGE_KEY: &str = "bsa-auth";
