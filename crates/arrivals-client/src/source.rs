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

//! Source abstraction for arrival data and its failure taxonomy.

use async_trait::async_trait;
use thiserror::Error;

use crate::flight::FlightRecord;

/// Errors returned by an [`ArrivalsSource`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure: unreachable host, timeout, reset connection.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    /// The body was not a JSON array of arrival objects.
    #[error("could not decode arrivals: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was rejected before anything was sent.
    #[error("invalid arrivals query: {0}")]
    InvalidQuery(String),
}

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connectivity, timeout or HTTP status failure.
    Transport,
    /// Response body did not match the expected shape.
    Decode,
    /// Rejected locally before a request was made.
    InvalidQuery,
}

impl FetchError {
    /// Collapse the error into the category the refresh loop reports.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) | FetchError::Status(_) => FailureKind::Transport,
            FetchError::Decode(_) => FailureKind::Decode,
            FetchError::InvalidQuery(_) => FailureKind::InvalidQuery,
        }
    }
}

/// Anything that can answer "which flights arrived at this airport between
/// `begin` and `end`".
#[async_trait]
pub trait ArrivalsSource: Send + Sync {
    async fn fetch_arrivals(
        &self,
        airport: &str,
        begin: i64,
        end: i64,
    ) -> Result<Vec<FlightRecord>, FetchError>;
}

/// Check the preconditions shared by every source.
pub fn validate_query(airport: &str, begin: i64, end: i64) -> Result<(), FetchError> {
    if airport.trim().is_empty() {
        return Err(FetchError::InvalidQuery("airport code is empty".to_string()));
    }
    if begin > end {
        return Err(FetchError::InvalidQuery(format!(
            "window begins after it ends ({begin} > {end})"
        )));
    }
    Ok(())
}
