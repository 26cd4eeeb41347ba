use super::{ProductTransport, TransportResponse};
use crate::config::FetchConfig;
use crate::error::{ConfigError, FetchError};
use async_trait::async_trait;
use surf::Client;
use url::Url;
use utils::endpoint_url;
use utils::surf_logging::SurfLogging;

/// Listing transport backed by surf.
///
/// Relative endpoints are resolved against `base_url`. No timeout is added
/// on top of surf's own.
#[derive(Clone)]
pub struct SurfTransport {
    http: Client,
    base_url: Url,
}

impl SurfTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            base_url,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.parsed_base_url()?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl ProductTransport for SurfTransport {
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError> {
        let connection_error = |reason: String| FetchError::Connection {
            endpoint: endpoint.to_string(),
            reason,
        };

        let url = endpoint_url::resolve(&self.base_url, endpoint)
            .map_err(|e| connection_error(e.to_string()))?;
        let mut response = self
            .http
            .get(url)
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let status = u16::from(response.status());
        let body = response
            .body_bytes()
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        Ok(TransportResponse::new(status, body))
    }
}
