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

//! Turns raw arrival records into rows ready for a list view.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::flight::FlightRecord;

/// Placeholder for timestamps chrono cannot represent.
const UNKNOWN_TIME: &str = "--:--";

/// One line of the arrivals board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    /// Trimmed callsign, or the uppercased ICAO address when there is none.
    pub label: String,
    /// Arrival time as `HH:MM`.
    pub arrival_clock_time: String,
}

impl fmt::Display for DisplayRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight: {}  |  Arrival: {}", self.label, self.arrival_clock_time)
    }
}

/// Label shown for a flight.
#[must_use]
pub fn flight_label(flight: &FlightRecord) -> String {
    flight
        .trimmed_callsign()
        .map_or_else(|| flight.vehicle_id.to_uppercase(), str::to_owned)
}

/// Format a Unix timestamp as `HH:MM` in the given zone.
pub fn clock_time_in<Tz>(epoch_seconds: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    DateTime::from_timestamp(epoch_seconds, 0).map_or_else(
        || UNKNOWN_TIME.to_string(),
        |utc| utc.with_timezone(tz).format("%H:%M").to_string(),
    )
}

/// Sort flights by arrival and derive their display rows in the local zone.
#[must_use]
pub fn format_for_display(flights: &[FlightRecord]) -> Vec<DisplayRow> {
    format_for_display_in(flights, &Local)
}

/// Same as [`format_for_display`] with an explicit time zone.
///
/// The sort is stable, so flights sharing a timestamp keep their input order.
pub fn format_for_display_in<Tz>(flights: &[FlightRecord], tz: &Tz) -> Vec<DisplayRow>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut sorted: Vec<&FlightRecord> = flights.iter().collect();
    sorted.sort_by_key(|f| f.first_seen);

    sorted
        .into_iter()
        .map(|flight| DisplayRow {
            label: flight_label(flight),
            arrival_clock_time: clock_time_in(flight.first_seen, tz),
        })
        .collect()
}

/// Header line for the last successful refresh, `Last Updated: HH:MM:SS`.
pub fn format_last_updated<Tz>(updated_at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("Last Updated: {}", updated_at.with_timezone(tz).format("%H:%M:%S"))
}
