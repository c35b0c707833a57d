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

//! Terminal rendering of the arrivals board for `--headless` runs.

use std::fmt;

use arrivals_client::{format_for_display_in, format_last_updated, BoardState, RefreshHandle};
use chrono::{Local, TimeZone};
use log::info;

/// Render the whole board as text, one flight per line.
pub fn render_board<Tz>(state: &BoardState, airport: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut lines = vec![format!("Arrivals at {airport}")];

    match state.last_updated {
        Some(at) => lines.push(format_last_updated(at, tz)),
        None => lines.push("Waiting for first update...".to_string()),
    }

    if let Some(error) = state.last_error.as_deref().filter(|_| state.is_stale()) {
        lines.push(format!(
            "Refresh failing ({} in a row): {}",
            state.consecutive_failures, error
        ));
    }

    let rows = format_for_display_in(&state.flights, tz);
    if rows.is_empty() && state.last_updated.is_some() {
        lines.push("No arrivals in the current window".to_string());
    }
    lines.extend(rows.iter().map(ToString::to_string));

    lines.join("\n")
}

/// Print the board on every change until Ctrl-C, then stop the refresh loop.
pub async fn run(handle: RefreshHandle, airport: &str) {
    let mut updates = handle.subscribe();
    let initial = updates.borrow_and_update().clone();
    println!("{}\n", render_board(&initial, airport, &Local));

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                println!("{}\n", render_board(&state, airport, &Local));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    handle.shutdown();
    handle.join().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrivals_client::FlightRecord;
    use chrono::{DateTime, Utc};

    #[test]
    fn test_render_idle_board() {
        let text = render_board(&BoardState::default(), "KMOD", &Utc);
        assert_eq!(text, "Arrivals at KMOD\nWaiting for first update...");
    }

    #[test]
    fn test_render_populated_board() {
        let state = BoardState {
            flights: vec![
                FlightRecord::new("abc123", 1_700_000_600, Some("KMOD"), Some("  ")),
                FlightRecord::new("def456", 1_700_000_000, Some("KMOD"), Some("UAL100 ")),
            ],
            last_updated: DateTime::from_timestamp(1_700_000_700, 0),
            ..Default::default()
        };

        let text = render_board(&state, "KMOD", &Utc);
        assert_eq!(
            text,
            "Arrivals at KMOD\n\
             Last Updated: 22:25:00\n\
             Flight: UAL100  |  Arrival: 22:13\n\
             Flight: ABC123  |  Arrival: 22:23"
        );
    }

    #[test]
    fn test_render_stale_board() {
        let state = BoardState {
            last_updated: DateTime::from_timestamp(1_700_000_700, 0),
            consecutive_failures: 2,
            last_error: Some("unexpected HTTP status: 503 Service Unavailable".to_string()),
            ..Default::default()
        };

        let text = render_board(&state, "KMOD", &Utc);
        assert!(text.contains("Refresh failing (2 in a row): unexpected HTTP status"));
        assert!(text.ends_with("No arrivals in the current window"));
    }
}
