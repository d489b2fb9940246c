//! ebx CLI Binary
//!
//! Command-line interface for the ElasticBox lifecycle client.

use anyhow::Context;
use clap::Parser;
use ebx::cli::{exit_code, map_error, Cli, RunContext};
use ebx::config::ConfigLoader;
use ebx::error::ApiError;
use ebx::logging::{init_logging, LoggingConfig};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let code = runtime.block_on(run(cli));
    process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    info!("ebx starting");

    let context = match RunContext::new(cli.project.clone(), cli.config.clone(), cli.json) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            return 1;
        }
    };

    // Ctrl-C cancels an in-flight wait; the request itself is not rolled back.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match context.execute(&cli.command, &cancel).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => report(&e),
    }
}

fn report(e: &ApiError) -> i32 {
    error!("Command failed: {}", e);
    eprintln!("{}", map_error(e));
    exit_code(e)
}

/// Build logging configuration from CLI args and the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
        None => ConfigLoader::load(&cli.project)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default(),
    };

    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.format = format.clone();
    }
    config
}
