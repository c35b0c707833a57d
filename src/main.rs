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

mod config;
mod console;
mod ui;

use clap::Parser;
use config::AppConfig;
use eframe::egui;
use log::{error, info};

/// Live arrivals board for a single airport, fed by the OpenSky Network.
#[derive(Parser, Debug)]
#[command(name = "arrivals-board", version, about)]
struct Cli {
    /// ICAO code of the airport to watch (e.g. KMOD)
    #[arg(long)]
    airport: Option<String>,

    /// Seconds between refreshes
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Length of the arrival window ending now, in seconds
    #[arg(long, value_name = "SECONDS")]
    lookback: Option<u64>,

    /// OpenSky API root
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Print the board to the terminal instead of opening a window
    #[arg(long)]
    headless: bool,

    /// Persist the effective settings to the config file
    #[arg(long)]
    save_config: bool,

    /// Print the config file location and exit
    #[arg(long)]
    print_config_path: bool,
}

impl Cli {
    /// Layer command line values over the stored configuration
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(airport) = &self.airport {
            config.airport.clone_from(airport);
        }
        if let Some(interval) = self.interval {
            config.refresh_interval_secs = interval;
        }
        if let Some(lookback) = self.lookback {
            config.lookback_secs = lookback;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        config.normalized()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.print_config_path {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let config = cli.apply(AppConfig::load_or_default());
    if cli.save_config {
        match config.save() {
            Ok(()) => info!("Configuration saved"),
            Err(e) => error!("Failed to save configuration: {}", e),
        }
    }

    let client = config.client_config(cli.base_url.as_deref());
    let refresh = config.refresh_config();

    if cli.headless {
        let runtime = tokio::runtime::Runtime::new()?;
        return runtime.block_on(async {
            let airport = refresh.airport.clone();
            let handle = arrivals_client::spawn_opensky(client, refresh)?;
            console::run(handle, &airport).await;
            Ok::<(), Box<dyn std::error::Error>>(())
        });
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 720.0])
            .with_title(format!("Arrivals Board · {}", config.airport)),
        ..Default::default()
    };

    eframe::run_native(
        "Arrivals Board",
        options,
        Box::new(move |cc| Ok(Box::new(ui::BoardApp::new(cc, client, refresh)?))),
    )?;

    Ok(())
}
