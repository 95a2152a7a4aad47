//! Metrics Anomaly - Main Entry Point

use clap::Parser;

use metrics_anomaly::api::{self, Cli};
use metrics_anomaly::constants;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    if let Err(e) = api::run(cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
