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

//! Arrival records as returned by the OpenSky `/flights/arrival` endpoint.

use serde::de::{self, Deserializer, Unexpected};
use serde::Deserialize;

/// One arrival reported by OpenSky.
///
/// Only the fields the board uses are modeled; everything else in the
/// response object is ignored during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlightRecord {
    /// ICAO 24-bit address of the airframe (hex string).
    #[serde(rename = "icao24", deserialize_with = "non_empty_string")]
    pub vehicle_id: String,
    /// Unix seconds of first radar contact, used as the arrival time.
    #[serde(rename = "firstSeen")]
    pub first_seen: i64,
    /// Estimated arrival airport (ICAO code), if OpenSky could infer one.
    #[serde(rename = "estArrivalAirport", default)]
    pub destination_airport: Option<String>,
    /// Broadcast callsign. OpenSky pads these with trailing spaces.
    #[serde(default)]
    pub callsign: Option<String>,
}

impl FlightRecord {
    /// Create a record directly, mostly useful for tests and fakes.
    #[must_use]
    pub fn new(
        vehicle_id: impl Into<String>,
        first_seen: i64,
        destination_airport: Option<&str>,
        callsign: Option<&str>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            first_seen,
            destination_airport: destination_airport.map(str::to_owned),
            callsign: callsign.map(str::to_owned),
        }
    }

    /// Callsign with padding removed, or `None` if it is absent or blank.
    #[must_use]
    pub fn trimmed_callsign(&self) -> Option<&str> {
        self.callsign
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        return Err(de::Error::invalid_value(
            Unexpected::Str(&value),
            &"a non-empty icao24 address",
        ));
    }
    Ok(value)
}
