//! Domain types exchanged with the BSA admin API
//!
//! All payloads are camelCase JSON. Records use Mongo-style `_id` keys,
//! `id` is accepted too when reading.

use serde::{Deserialize, Serialize};

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Persisted authentication record
///
/// Also the shape of the login, register and renew responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Category record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub num_products: Option<u64>,
    /// Only present on detail reads
    #[serde(default)]
    pub products: Option<Vec<Product>>,
}

/// Brand record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub num_products: Option<u64>,
    /// Only present on detail reads
    #[serde(default)]
    pub products: Option<Vec<Product>>,
}

/// Product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub category: Option<Related>,
    #[serde(default)]
    pub brand: Option<Related>,
}

/// Reference from a product to its category or brand.
///
/// Denormalized into a nested record on most reads, a bare id otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Related {
    Id(String),
    Record(RelatedRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Related {
    pub fn id(&self) -> &str {
        match self {
            Related::Id(id) => id,
            Related::Record(record) => &record.id,
        }
    }

    /// Display name, falling back to the id
    pub fn label(&self) -> &str {
        match self {
            Related::Id(id) => id,
            Related::Record(record) => record.name.as_deref().unwrap_or(&record.id),
        }
    }
}

/// Totals shown on the dashboard home screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub products_total: u64,
    pub categories_total: u64,
    pub brands_total: u64,
}

/// Body of create/update calls
pub trait WritePayload: Serialize + Send + Sync {
    /// Target id for updates
    fn id(&self) -> Option<&str>;
}

/// Category create/update body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Brand create/update body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Product create/update body. Category and brand go out as bare ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub quantity: u32,
    pub category: String,
    pub brand: String,
}

impl WritePayload for CategoryPayload {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl WritePayload for BrandPayload {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl WritePayload for ProductPayload {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl From<&Category> for CategoryPayload {
    fn from(c: &Category) -> Self {
        Self {
            id: Some(c.id.clone()),
            name: c.name.clone(),
            description: c.description.clone(),
        }
    }
}

impl From<&Brand> for BrandPayload {
    fn from(b: &Brand) -> Self {
        Self {
            id: Some(b.id.clone()),
            name: b.name.clone(),
            description: b.description.clone(),
        }
    }
}

impl From<&Product> for ProductPayload {
    fn from(p: &Product) -> Self {
        Self {
            id: Some(p.id.clone()),
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price,
            quantity: p.quantity,
            category: p.category.as_ref().map(|c| c.id().to_string()).unwrap_or_default(),
            brand: p.brand.as_ref().map(|b| b.id().to_string()).unwrap_or_default(),
        }
    }
}

/// Query parameters of a list call, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    params: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(self, limit: u32) -> Self {
        self.param("limit", limit.to_string())
    }

    pub fn page(self, page: u32) -> Self {
        self.param("page", page.to_string())
    }

    /// Ask the server for the full collection
    pub fn no_pagination(self) -> Self {
        self.param("noPagination", "true")
    }

    /// Filter by field, e.g. `category` or `brand`
    pub fn filter(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.param(key, value)
    }

    /// Set a parameter, replacing a previous value for the same key
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.params.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.params.push((key, value));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_with_nested_refs() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1",
            "name": "Hammer",
            "description": null,
            "price": 12.5,
            "quantity": 3,
            "category": {"_id": "c1", "name": "Tools"},
            "brand": "b1"
        }))
        .unwrap();

        assert_eq!(product.id, "p1");
        assert_eq!(product.category.as_ref().unwrap().label(), "Tools");
        assert_eq!(product.brand.as_ref().unwrap().id(), "b1");

        let payload = ProductPayload::from(&product);
        assert_eq!(payload.category, "c1");
        assert_eq!(payload.brand, "b1");
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let result: Result<Product, _> = serde_json::from_value(json!({
            "_id": "p1", "name": "Hammer", "price": 1.0, "quantity": -1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_category_accepts_either_id_key() {
        let a: Category = serde_json::from_value(json!({"_id": "c1", "name": "Tools", "numProducts": 4})).unwrap();
        let b: Category = serde_json::from_value(json!({"id": "c1", "name": "Tools"})).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.num_products, Some(4));
        assert!(b.products.is_none());
    }

    #[test]
    fn test_payload_skips_missing_id() {
        let payload = CategoryPayload {
            id: None,
            name: "Tools".to_string(),
            description: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"name": "Tools"}));
    }

    #[test]
    fn test_session_wire_format() {
        let session: Session = serde_json::from_value(json!({
            "accessToken": "a",
            "refreshToken": "r",
            "user": {"name": "Ada", "email": "ada@example.com"}
        }))
        .unwrap();
        assert!(session.has_refresh_token());
        assert_eq!(session.user.unwrap().name, "Ada");
    }

    #[test]
    fn test_list_query_replaces_keys() {
        let query = ListQuery::new().limit(5).page(1).filter("brand", "b1").page(2);
        assert_eq!(query.get("page"), Some("2"));
        assert_eq!(query.pairs().len(), 3);
    }
}
