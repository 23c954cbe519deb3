//! Slot fetch boundary: one lazy, cancellable network call per attempt.

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{LocationId, Slot},
    error::FetchError,
    protocol::SlotQuery,
};
use thiserror::Error;
use url::Url;

#[async_trait]
pub trait SlotFetcher: Send + Sync {
    /// Resolves to the slots currently offered at `location_id`.
    ///
    /// Dropping the returned future abandons the request.
    async fn fetch_slots(&self, location_id: LocationId) -> Result<Vec<Slot>, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetcherConfigError {
    #[error("invalid scheduler url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("scheduler url '{0}' must use http or https")]
    UnsupportedScheme(String),
}

pub struct HttpSlotFetcher {
    http: Client,
    base_url: Url,
}

impl HttpSlotFetcher {
    pub fn new(base_url: &str) -> Result<Self, FetcherConfigError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, FetcherConfigError> {
        let parsed = Url::parse(base_url).map_err(|source| FetcherConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetcherConfigError::UnsupportedScheme(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    fn request(&self, location_id: LocationId) -> reqwest::RequestBuilder {
        self.http
            .get(self.base_url.clone())
            .query(&SlotQuery::for_location(location_id))
    }
}

#[async_trait]
impl SlotFetcher for HttpSlotFetcher {
    async fn fetch_slots(&self, location_id: LocationId) -> Result<Vec<Slot>, FetchError> {
        let response = self
            .request(location_id)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Slot>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/fetcher_tests.rs"]
mod tests;
