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

//! Desktop window showing the arrivals board.
//!
//! The window owns the tokio runtime that drives the refresh loop. A small
//! task forwards board changes to `request_repaint`, so frames are only drawn
//! when something changed or the user interacts.

use arrivals_client::{
    format_for_display, format_last_updated, spawn_opensky, BoardState, ClientConfig, DisplayRow,
    RefreshConfig, RefreshHandle,
};
use chrono::Local;
use eframe::egui;
use log::info;
use tokio::sync::watch;

/// eframe application for the arrivals board
pub struct BoardApp {
    airport: String,
    updates: watch::Receiver<BoardState>,
    state: BoardState,
    rows: Vec<DisplayRow>,
    // Declared before the runtime so the loop is cancelled before the runtime shuts down
    refresh: RefreshHandle,
    _runtime: tokio::runtime::Runtime,
}

impl BoardApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        client: ClientConfig,
        refresh: RefreshConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let runtime = tokio::runtime::Runtime::new()?;
        let airport = refresh.airport.clone();

        info!("Starting arrivals refresh for {} against {}", airport, client.base_url);
        let handle = {
            let _guard = runtime.enter();
            spawn_opensky(client, refresh)?
        };

        let mut changes = handle.subscribe();
        let ctx = cc.egui_ctx.clone();
        runtime.spawn(async move {
            while changes.changed().await.is_ok() {
                ctx.request_repaint();
            }
        });

        let mut updates = handle.subscribe();
        let state = updates.borrow_and_update().clone();
        let rows = format_for_display(&state.flights);

        Ok(Self {
            airport,
            updates,
            state,
            rows,
            refresh: handle,
            _runtime: runtime,
        })
    }

    /// Pull the latest board snapshot if the refresh loop published one
    fn sync_state(&mut self) {
        if self.updates.has_changed().unwrap_or(false) {
            self.state = self.updates.borrow_and_update().clone();
            self.rows = format_for_display(&self.state.flights);
        }
    }

    fn draw_header(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new(format!("✈ ARRIVALS · {}", self.airport))
            .color(egui::Color32::from_rgb(100, 200, 100))
            .size(16.0)
            .strong());

        if let Some(at) = self.state.last_updated {
            ui.label(egui::RichText::new(format_last_updated(at, &Local))
                .color(egui::Color32::from_rgb(150, 150, 150))
                .size(11.0)
                .monospace());
        }

        if let Some(error) = self.state.last_error.as_deref().filter(|_| self.state.is_stale()) {
            ui.label(egui::RichText::new(format!(
                "⚠ Refresh failing ({} in a row)",
                self.state.consecutive_failures
            ))
                .color(egui::Color32::from_rgb(255, 200, 50))
                .size(11.0))
                .on_hover_text(error);
        }
    }

    fn draw_rows(&self, ui: &mut egui::Ui) {
        if self.rows.is_empty() {
            let message = if self.state.last_updated.is_some() {
                "No arrivals in the current window"
            } else {
                "Waiting for first update..."
            };
            ui.label(egui::RichText::new(message)
                .color(egui::Color32::from_rgb(120, 120, 120))
                .italics());
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.push_id("arrivals_list", |ui| {
                    for row in &self.rows {
                        ui.label(egui::RichText::new(row.to_string())
                            .color(egui::Color32::from_rgb(200, 220, 255))
                            .size(13.0)
                            .monospace());
                    }
                });
            });
    }
}

impl eframe::App for BoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_state();

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_header(ui);
            ui.separator();
            self.draw_rows(ui);
        });
    }
}

impl Drop for BoardApp {
    fn drop(&mut self) {
        info!("Closing arrivals board for {}", self.airport);
        self.refresh.shutdown();
    }
}
