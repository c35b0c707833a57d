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

//! Application configuration management.
//!
//! Settings are persisted in TOML via `confy`. Missing fields fall back to
//! serde defaults, so older or hand-edited files keep loading.

use std::time::Duration;

use arrivals_client::{ClientConfig, RefreshConfig, DEFAULT_BASE_URL};
use log::warn;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "arrivals-board";
const CONFIG_NAME: &str = "config";

/// Environment variable that overrides the configured API root.
pub const BASE_URL_ENV: &str = "OPENSKY_BASE_URL";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// ICAO code of the airport to watch
    #[serde(default = "default_airport")]
    pub airport: String,

    /// OpenSky API root (env var takes precedence)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Length of the arrival window ending now, in seconds
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,

    /// Delay between refreshes, in seconds
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_airport() -> String {
    arrivals_client::refresh::DEFAULT_AIRPORT.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_lookback_secs() -> u64 {
    3600
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            airport: default_airport(),
            base_url: default_base_url(),
            lookback_secs: default_lookback_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Load configuration, falling back to defaults if the file is unreadable
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!("Could not load configuration, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve the API root: command line, then environment variable, then config
    pub fn resolve_base_url(&self, cli_value: Option<&str>) -> String {
        Self::pick_base_url(cli_value, std::env::var(BASE_URL_ENV).ok(), &self.base_url)
    }

    fn pick_base_url(
        cli_value: Option<&str>,
        env_value: Option<String>,
        configured: &str,
    ) -> String {
        cli_value
            .map(str::to_string)
            .into_iter()
            .chain(env_value)
            .find(|url| !url.trim().is_empty())
            .unwrap_or_else(|| configured.to_string())
    }

    /// Clamp values that would make the refresh loop misbehave
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let airport = self.airport.trim().to_uppercase();
        if airport.is_empty() {
            warn!("Empty airport in configuration, using {}", default_airport());
            self.airport = default_airport();
        } else {
            self.airport = airport;
        }

        // A zero interval would hammer the API
        self.refresh_interval_secs = self.refresh_interval_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self
    }

    /// HTTP client settings derived from this configuration
    pub fn client_config(&self, base_url_override: Option<&str>) -> ClientConfig {
        ClientConfig {
            base_url: self.resolve_base_url(base_url_override),
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..Default::default()
        }
    }

    /// Refresh loop settings derived from this configuration
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            airport: self.airport.clone(),
            lookback: Duration::from_secs(self.lookback_secs),
            interval: Duration::from_secs(self.refresh_interval_secs),
        }
    }
}
