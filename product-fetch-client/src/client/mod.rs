pub mod http;

use crate::error::FetchError;
use crate::product::Product;
use async_trait::async_trait;
use serde_json::Value;

/// Raw response of a listing endpoint.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs the GET for one listing endpoint.
///
/// Implementations report connection-level failures as errors; any HTTP
/// status, successful or not, comes back as a `TransportResponse`.
#[async_trait]
pub trait ProductTransport: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError>;
}

/// Fetch a listing and turn the response into products.
pub(crate) async fn fetch_listing(
    transport: &dyn ProductTransport,
    endpoint: &str,
) -> Result<Vec<Product>, FetchError> {
    let response = transport.get(endpoint).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            endpoint: endpoint.to_string(),
            status: response.status,
        });
    }
    parse_listing(endpoint, &response.body)
}

/// Extract the `data` array from a listing body.
///
/// A body that is not JSON is a `Decode` error. Valid JSON of any shape other
/// than an object with a `data` array is `Malformed`.
pub(crate) fn parse_listing(endpoint: &str, body: &[u8]) -> Result<Vec<Product>, FetchError> {
    let malformed = |reason: &str| FetchError::Malformed {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let value: Value = serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    let Value::Object(mut fields) = value else {
        return Err(malformed("top-level value is not an object"));
    };

    match fields.remove("data") {
        Some(Value::Array(items)) => Ok(items.into_iter().map(Product::new).collect()),
        _ => Err(malformed("missing `data` array")),
    }
}
