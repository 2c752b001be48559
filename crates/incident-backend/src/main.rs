#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

pub mod mode;

use std::process::ExitCode;

use clap::Parser;
use config::{Config, args::ArgsConfig, get_config};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = ArgsConfig::parse();

    let config = match get_config(args, true) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    if config.debug_mode() {
        warn!("Debug mode is enabled");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Tokio runtime creation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        match mode::run(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{:?}", e);
                ExitCode::FAILURE
            }
        }
    })
}

/// Logs go to stderr. Standard output is reserved for command results.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_timestamp() {
        builder.init();
    } else {
        builder.without_time().init();
    }
}
