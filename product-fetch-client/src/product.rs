use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product record as returned by the catalog API.
///
/// The record is kept verbatim; accessors only peek at well-known fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product(Value);

impl Product {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    pub fn slug(&self) -> Option<&str> {
        self.field_str("slug")
    }

    pub fn name(&self) -> Option<&str> {
        self.field_str("name")
    }

    pub fn category(&self) -> Option<&str> {
        self.field_str("category")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn field_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

impl From<Value> for Product {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let product = Product::new(json!({
            "id": 7,
            "slug": "vertical-01",
            "name": "Памятник вертикальный",
            "category": "complex",
            "colors": [{ "name": "gabbro" }]
        }));

        assert_eq!(product.id(), Some(7));
        assert_eq!(product.slug(), Some("vertical-01"));
        assert_eq!(product.category(), Some("complex"));
        assert!(product.name().is_some());
    }

    #[test]
    fn test_non_object_record_is_kept() {
        let product: Product = serde_json::from_str("42").unwrap();
        assert_eq!(product.id(), None);
        assert_eq!(product.as_value(), &json!(42));
    }
}
