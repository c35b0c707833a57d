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

//! Periodic arrivals polling and published board state.
//!
//! A [`RefreshLoop`] fetches one lookback window per cycle, replaces the
//! published [`BoardState`] on success, and leaves it alone on failure. The
//! state is broadcast through a `watch` channel so views can re-render on
//! change instead of polling. The loop is strictly sequential: the next cycle
//! starts only after the previous fetch finished and the interval elapsed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::flight::FlightRecord;
use crate::source::{ArrivalsSource, FetchError};

/// Airport polled when nothing else is configured.
pub const DEFAULT_AIRPORT: &str = "KMOD";
/// Length of the arrival window ending at "now".
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(3600);
/// Pause between the end of one cycle and the start of the next.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Source of wall-clock time for window computation and timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Range of Unix seconds queried in one cycle, `[begin, end)`.
///
/// Both bounds go to the server as-is; whether it includes `end` is up to
/// the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalWindow {
    pub begin: i64,
    pub end: i64,
}

impl ArrivalWindow {
    /// Window of length `lookback` ending at `now`.
    #[must_use]
    pub fn ending_at(now: i64, lookback: Duration) -> Self {
        let lookback = i64::try_from(lookback.as_secs()).unwrap_or(i64::MAX);
        Self {
            begin: now.saturating_sub(lookback),
            end: now,
        }
    }
}

/// Configuration for a [`RefreshLoop`].
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// ICAO code of the airport to poll.
    pub airport: String,
    /// Length of the arrival window.
    pub lookback: Duration,
    /// Delay between cycles.
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            airport: DEFAULT_AIRPORT.to_string(),
            lookback: DEFAULT_LOOKBACK,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Whether the board has ever been filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPhase {
    /// No fetch has succeeded yet.
    Idle,
    /// At least one fetch has succeeded.
    Populated,
}

/// Snapshot published after every cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    /// Flights from the last successful fetch, in the order received.
    pub flights: Vec<FlightRecord>,
    /// When the last successful fetch completed.
    pub last_updated: Option<DateTime<Utc>>,
    /// Failed cycles since the last success.
    pub consecutive_failures: u32,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

impl BoardState {
    #[must_use]
    pub fn phase(&self) -> BoardPhase {
        if self.last_updated.is_some() {
            BoardPhase::Populated
        } else {
            BoardPhase::Idle
        }
    }

    /// True when the most recent cycle failed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Polls an [`ArrivalsSource`] and owns the published [`BoardState`].
pub struct RefreshLoop {
    config: RefreshConfig,
    source: Arc<dyn ArrivalsSource>,
    clock: Arc<dyn Clock>,
    state_tx: watch::Sender<BoardState>,
}

impl fmt::Debug for RefreshLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshLoop")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RefreshLoop {
    #[must_use]
    pub fn new(
        config: RefreshConfig,
        source: Arc<dyn ArrivalsSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state_tx, _) = watch::channel(BoardState::default());
        Self {
            config,
            source,
            clock,
            state_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state_tx.subscribe()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> BoardState {
        self.state_tx.borrow().clone()
    }

    /// Run a single fetch cycle and apply its outcome.
    ///
    /// Returns the number of flights now on the board, or the error that left
    /// the board unchanged.
    pub async fn refresh_once(&self) -> Result<usize, FetchError> {
        let window = ArrivalWindow::ending_at(self.clock.now().timestamp(), self.config.lookback);
        debug!(
            "Fetching arrivals for {} in [{}, {}]",
            self.config.airport, window.begin, window.end
        );

        let result = self
            .source
            .fetch_arrivals(&self.config.airport, window.begin, window.end)
            .await;
        self.apply(result)
    }

    fn apply(&self, result: Result<Vec<FlightRecord>, FetchError>) -> Result<usize, FetchError> {
        match result {
            Ok(flights) => {
                let count = flights.len();
                let completed_at = self.clock.now();
                self.state_tx.send_modify(|state| {
                    state.flights = flights;
                    state.last_updated = Some(completed_at);
                    state.consecutive_failures = 0;
                    state.last_error = None;
                });
                Ok(count)
            }
            Err(e) => {
                let message = e.to_string();
                self.state_tx.send_modify(|state| {
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    state.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Start polling on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> RefreshHandle {
        let cancel_token = CancellationToken::new();
        let state_rx = self.subscribe();
        let task = tokio::spawn(self.run(cancel_token.clone()));

        RefreshHandle {
            cancel_token,
            task: Some(task),
            state_rx,
        }
    }

    async fn run(self, cancel_token: CancellationToken) {
        info!(
            "Refreshing arrivals for {} every {}s (lookback {}s)",
            self.config.airport,
            self.config.interval.as_secs(),
            self.config.lookback.as_secs()
        );

        loop {
            // Dropping the fetch on cancel discards its result.
            let outcome = tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                outcome = self.refresh_once() => outcome,
            };

            match outcome {
                Ok(count) => debug!("Board updated with {} arrivals", count),
                Err(e) => warn!("Arrivals refresh failed, keeping previous board: {}", e),
            }

            tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                () = sleep(self.config.interval) => {}
            }
        }

        info!("Arrivals refresh for {} stopped", self.config.airport);
    }
}

/// Handle to a running [`RefreshLoop`]. Dropping it stops the loop.
#[derive(Debug)]
pub struct RefreshHandle {
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
    state_rx: watch::Receiver<BoardState>,
}

impl RefreshHandle {
    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state_rx.clone()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> BoardState {
        self.state_rx.borrow().clone()
    }

    /// Ask the loop to stop. Any in-flight fetch is abandoned.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop task to exit.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Arrivals refresh task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Scripted = Result<Vec<FlightRecord>, FetchError>;

    /// Replays scripted responses and records every query it receives.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<(String, i64, i64)>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<(String, i64, i64)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArrivalsSource for ScriptedSource {
        async fn fetch_arrivals(&self, airport: &str, begin: i64, end: i64) -> Scripted {
            self.requests
                .lock()
                .unwrap()
                .push((airport.to_string(), begin, end));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::InvalidQuery("script exhausted".to_string())))
        }
    }

    /// Answers with three flights after a delay.
    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl ArrivalsSource for SlowSource {
        async fn fetch_arrivals(&self, _: &str, _: i64, _: i64) -> Scripted {
            sleep(self.delay).await;
            Ok(three_flights())
        }
    }

    fn spawn_slow(delay: Duration) -> RefreshHandle {
        RefreshLoop::new(
            RefreshConfig::default(),
            Arc::new(SlowSource { delay }),
            PausedClock::at(NOW),
        )
        .spawn()
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Wall clock that follows tokio's (paused) time.
    struct PausedClock {
        base: DateTime<Utc>,
        started: tokio::time::Instant,
    }

    impl PausedClock {
        fn at(epoch_seconds: i64) -> Arc<Self> {
            Arc::new(Self {
                base: DateTime::from_timestamp(epoch_seconds, 0).unwrap(),
                started: tokio::time::Instant::now(),
            })
        }
    }

    impl Clock for PausedClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap();
            self.base + elapsed
        }
    }

    const NOW: i64 = 1_700_000_000;

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(DateTime::from_timestamp(NOW, 0).unwrap()))
    }

    fn three_flights() -> Vec<FlightRecord> {
        vec![
            FlightRecord::new("a1b2c3", NOW - 100, Some("KMOD"), Some("SKW5123 ")),
            FlightRecord::new("d4e5f6", NOW - 900, Some("KMOD"), None),
            FlightRecord::new("0a0b0c", NOW - 50, None, Some("UAL100")),
        ]
    }

    fn unavailable() -> FetchError {
        FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)
    }

    #[test]
    fn test_window_ending_at() {
        let window = ArrivalWindow::ending_at(NOW, DEFAULT_LOOKBACK);
        assert_eq!(
            window,
            ArrivalWindow {
                begin: 1_699_996_400,
                end: 1_700_000_000,
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_queries_one_hour_window() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);
        let refresh = RefreshLoop::new(RefreshConfig::default(), source.clone(), fixed_clock());

        refresh.refresh_once().await.unwrap();

        assert_eq!(
            source.requests(),
            vec![("KMOD".to_string(), 1_699_996_400, 1_700_000_000)]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_board() {
        let source = ScriptedSource::new(vec![Ok(three_flights()), Err(unavailable())]);
        let refresh = RefreshLoop::new(RefreshConfig::default(), source, fixed_clock());

        assert_eq!(refresh.refresh_once().await.unwrap(), 3);
        let before = refresh.state();

        assert!(refresh.refresh_once().await.is_err());
        let after = refresh.state();

        assert_eq!(after.flights, three_flights());
        assert_eq!(after.last_updated, before.last_updated);
        assert_eq!(after.consecutive_failures, 1);
        assert!(after.is_stale());
        assert!(after.last_error.is_some());
    }

    #[tokio::test]
    async fn test_empty_success_clears_board() {
        let source = ScriptedSource::new(vec![Ok(three_flights()), Ok(Vec::new())]);
        let refresh = RefreshLoop::new(RefreshConfig::default(), source, fixed_clock());

        refresh.refresh_once().await.unwrap();
        assert_eq!(refresh.state().flights.len(), 3);

        assert_eq!(refresh.refresh_once().await.unwrap(), 0);
        let state = refresh.state();
        assert!(state.flights.is_empty());
        assert_eq!(state.phase(), BoardPhase::Populated);
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let source = ScriptedSource::new(vec![Err(unavailable()), Ok(three_flights())]);
        let refresh = RefreshLoop::new(RefreshConfig::default(), source, fixed_clock());
        assert_eq!(refresh.state().phase(), BoardPhase::Idle);

        assert!(refresh.refresh_once().await.is_err());
        let state = refresh.state();
        assert_eq!(state.phase(), BoardPhase::Idle);
        assert!(state.flights.is_empty());

        refresh.refresh_once().await.unwrap();
        let state = refresh.state();
        assert_eq!(state.phase(), BoardPhase::Populated);
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_polls_every_interval() {
        let source = ScriptedSource::new(vec![Ok(three_flights()), Ok(Vec::new())]);
        let handle = RefreshLoop::new(
            RefreshConfig::default(),
            source.clone(),
            PausedClock::at(NOW),
        )
        .spawn();
        let mut rx = handle.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().flights.len(), 3);

        sleep(Duration::from_secs(59)).await;
        assert_eq!(source.requests().len(), 1);

        sleep(Duration::from_secs(2)).await;
        let requests = source.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].1, NOW + 60 - 3600);
        assert_eq!(requests[1].2, NOW + 60);
        assert!(handle.state().flights.is_empty());

        handle.shutdown();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_failures() {
        let source = ScriptedSource::new(vec![Err(unavailable()), Ok(three_flights())]);
        let handle =
            RefreshLoop::new(RefreshConfig::default(), source, PausedClock::at(NOW)).spawn();
        let mut rx = handle.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase(), BoardPhase::Idle);

        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.flights.len(), 3);
        assert_eq!(state.last_updated.unwrap().timestamp(), NOW + 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_sleep_stops_polling() {
        let source = ScriptedSource::new(vec![Ok(three_flights())]);
        let handle = RefreshLoop::new(
            RefreshConfig::default(),
            source.clone(),
            PausedClock::at(NOW),
        )
        .spawn();
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        handle.shutdown();
        handle.join().await;

        sleep(Duration::from_secs(600)).await;
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_lands_when_not_cancelled() {
        let handle = spawn_slow(Duration::from_secs(5));
        let rx = handle.subscribe();

        sleep(Duration::from_secs(30)).await;
        let state = rx.borrow().clone();
        assert_eq!(state.phase(), BoardPhase::Populated);
        assert_eq!(state.flights.len(), 3);
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_in_flight_fetch() {
        let handle = spawn_slow(Duration::from_secs(5));
        let rx = handle.subscribe();

        sleep(Duration::from_secs(1)).await;
        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("loop did not stop");

        // Well past the point where the fetch would have completed
        sleep(Duration::from_secs(30)).await;
        let state = rx.borrow().clone();
        assert_eq!(state.phase(), BoardPhase::Idle);
        assert!(state.flights.is_empty());
        assert!(state.last_updated.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_loop() {
        let source = ScriptedSource::new(vec![Ok(three_flights())]);
        let handle = RefreshLoop::new(
            RefreshConfig::default(),
            source.clone(),
            PausedClock::at(NOW),
        )
        .spawn();
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        drop(handle);
        sleep(Duration::from_secs(300)).await;
        assert_eq!(source.requests().len(), 1);
    }
}
