//! HTTP client utilities.

use reqwest::Client;
use std::sync::Arc;

use crate::config::{NetworkConfig, ScholarConfig};
use crate::sources::SourceError;

/// Shared HTTP client presenting a browser-like identity
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client from the scholar identity and network timeouts
    pub fn new(scholar: &ScholarConfig, network: &NetworkConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(scholar.user_agent.as_str())
            .timeout(network.request_timeout())
            .connect_timeout(network.connect_timeout())
            .gzip(true)
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url)
    }
}
