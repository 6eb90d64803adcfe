//! Network fetcher backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use pdfsplit::cache::{Fetcher, Request, Response};
use pdfsplit::Error;

const USER_AGENT: &str = concat!("pdfsplit/", env!("CARGO_PKG_VERSION"));

/// Performs the worker's live network requests.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> pdfsplit::Result<Response> {
        let fetch_err = |reason: String| Error::Fetch {
            url: request.url().to_string(),
            reason,
        };

        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| fetch_err(e.to_string()))?;
        let response = self
            .client
            .request(method, request.url().clone())
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        log::debug!("{} {} -> {}", request.method(), request.url(), status);
        Ok(Response {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
