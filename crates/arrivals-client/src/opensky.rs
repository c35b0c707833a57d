// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client for the OpenSky Network arrivals endpoint.
//!
//! One GET per call, no retries. Transport problems, non-2xx statuses and
//! undecodable bodies all surface as a [`FetchError`].

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, Url};

use crate::flight::FlightRecord;
use crate::source::{validate_query, ArrivalsSource, FetchError};

/// Public OpenSky REST root.
pub const DEFAULT_BASE_URL: &str = "https://opensky-network.org/api";

/// Configuration for [`OpenSkyClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without the `/flights/arrival` suffix.
    pub base_url: String,
    /// Upper bound on a single request, connect through body.
    pub timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
            user_agent: concat!("arrivals-board/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Build the arrivals request URL for an airport and window.
pub fn arrivals_url(
    base_url: &str,
    airport: &str,
    begin: i64,
    end: i64,
) -> Result<Url, FetchError> {
    let endpoint = format!("{}/flights/arrival", base_url.trim_end_matches('/'));
    let begin = begin.to_string();
    let end = end.to_string();

    Url::parse_with_params(
        &endpoint,
        &[("airport", airport), ("begin", begin.as_str()), ("end", end.as_str())],
    )
    .map_err(|e| FetchError::InvalidQuery(format!("bad base URL '{base_url}': {e}")))
}

/// Decode an arrivals response body.
pub fn parse_arrivals(body: &[u8]) -> Result<Vec<FlightRecord>, FetchError> {
    Ok(serde_json::from_slice(body)?)
}

/// Arrivals source backed by the OpenSky REST API.
#[derive(Debug, Clone)]
pub struct OpenSkyClient {
    http_client: HttpClient,
    base_url: String,
}

impl OpenSkyClient {
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let http_client = HttpClient::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ArrivalsSource for OpenSkyClient {
    async fn fetch_arrivals(
        &self,
        airport: &str,
        begin: i64,
        end: i64,
    ) -> Result<Vec<FlightRecord>, FetchError> {
        validate_query(airport, begin, end)?;
        let url = arrivals_url(&self.base_url, airport.trim(), begin, end)?;
        debug!("GET {}", url);

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let flights = parse_arrivals(&body)?;
        debug!("Decoded {} arrivals for {}", flights.len(), airport);
        Ok(flights)
    }
}
