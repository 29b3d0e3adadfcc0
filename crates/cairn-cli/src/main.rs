//! Cairn CLI: the `cairn` protocol server.
//!
//! Stdout carries protocol frames exclusively; diagnostics go to
//! stderr through `tracing` (filtered by `CAIRN_LOG`, default `warn`).

mod cli;
mod config;
mod serve;

use clap::Parser;

use cli::Cli;
use config::Config;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config = match Config::resolve(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        workers = config.workers,
        error_recovery = config.error_recovery,
        prelude = config.prelude,
        framing = ?config.framing,
        print_mode = ?config.print_mode,
        "serving protocol on stdin/stdout"
    );

    std::process::exit(serve::run(&config));
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("CAIRN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
