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

//! Headless core of the arrivals board.
//!
//! Polls the OpenSky Network for flights that arrived at one airport during a
//! rolling window and turns them into display rows. Nothing here knows about
//! a particular UI; views subscribe to the published [`BoardState`].
//!
//! - **Source layer**: [`ArrivalsSource`] trait and the [`OpenSkyClient`]
//!   HTTP implementation
//! - **Refresh layer**: [`RefreshLoop`] with cancellation and a `watch`
//!   channel of board snapshots
//! - **Display layer**: pure formatting of records into [`DisplayRow`]s
//!
//! # Quick Start
//!
//! ```no_run
//! use arrivals_client::{spawn_opensky, ClientConfig, RefreshConfig, format_for_display};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arrivals_client::FetchError> {
//!     let handle = spawn_opensky(ClientConfig::default(), RefreshConfig::default())?;
//!     let mut updates = handle.subscribe();
//!
//!     while updates.changed().await.is_ok() {
//!         for row in format_for_display(&updates.borrow_and_update().flights) {
//!             println!("{row}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod display;
pub mod flight;
pub mod opensky;
pub mod refresh;
pub mod source;

use std::sync::Arc;

pub use display::{
    flight_label, format_for_display, format_for_display_in, format_last_updated, DisplayRow,
};
pub use flight::FlightRecord;
pub use opensky::{ClientConfig, OpenSkyClient, DEFAULT_BASE_URL};
pub use refresh::{
    ArrivalWindow, BoardPhase, BoardState, Clock, RefreshConfig, RefreshHandle, RefreshLoop,
    SystemClock,
};
pub use source::{ArrivalsSource, FailureKind, FetchError};

/// Build an OpenSky client and start polling it on the current runtime.
pub fn spawn_opensky(
    client: ClientConfig,
    refresh: RefreshConfig,
) -> Result<RefreshHandle, FetchError> {
    let source = OpenSkyClient::new(client)?;
    Ok(RefreshLoop::new(refresh, Arc::new(source), Arc::new(SystemClock)).spawn())
}
