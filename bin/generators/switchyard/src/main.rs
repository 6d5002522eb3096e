//! Switchyard - a synthetic service topology previewer.
//!
//! Switchyard loads a description of a fleet of services and the calls between their routes, validates it, and then
//! simulates a bounded number of calls through every route, reporting the latencies it would generate and how often
//! resource attributes would be attached.

#![deny(warnings)]
#![deny(missing_docs)]

use anyhow::Error as GenericError;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod config;
use self::config::Config;

mod driver;
use self::driver::Driver;

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(true)
        .with_target(true)
        .init();

    match run() {
        Ok(()) => info!("switchyard stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), GenericError> {
    info!("switchyard starting...");

    // We only accept a single command line argument: the path to the configuration file.
    let config_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            error!("Path to the configuration file must be passed as the first (and only) argument to `switchyard`.");
            std::process::exit(1);
        }
    };

    let config = Config::try_from_file(&config_path)?;
    let driver = Driver::new(config)?;
    driver.run();

    Ok(())
}
