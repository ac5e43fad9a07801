#![cfg(not(tarpaulin_include))]

use log::error;
use warning_board::{Config, app};

/// Main entry point for the web server
///
/// Reads the `WARNING_BOARD_*` environment variables and serves the dashboard
/// until the process is stopped. Log output follows `RUST_LOG` and defaults
/// to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return Err(err.into());
        }
    };

    app::run(config).await
}
