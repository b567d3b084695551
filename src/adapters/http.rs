use crate::config::FetchConfig;
use crate::domain::ports::SourceFetcher;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::validate_fetch_url;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::time::Duration;

/// Source fetcher over HTTP(S) with short timeouts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::from_config(&FetchConfig::default())
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = validate_fetch_url("source", url).map_err(|e| ApiError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!("Source response status: {}", status);

        if !status.is_success() {
            return Err(ApiError::Fetch {
                url: url.to_string(),
                reason: format!("upstream returned {}", status),
            });
        }

        let body = response.bytes().await?.to_vec();
        if body.is_empty() {
            return Err(ApiError::Fetch {
                url: url.to_string(),
                reason: "empty response body".to_string(),
            });
        }

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
