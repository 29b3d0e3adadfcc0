use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Cairn: a machine-facing S-expression protocol for an interactive elaboration engine",
    version
)]
pub struct Cli {
    /// Standard-library location handed to the engine
    #[arg(long)]
    pub stdlib: Option<PathBuf>,

    /// Extra load path searched by Require (repeatable)
    #[arg(long = "load-path")]
    pub load_path: Vec<PathBuf>,

    /// Skip the prelude at boot
    #[arg(long)]
    pub no_prelude: bool,

    /// Background worker count for deferred elaboration (0 = fully synchronous)
    #[arg(long)]
    pub async_workers: Option<usize>,

    /// Keep executing past failed nodes against the last good snapshot
    #[arg(long)]
    pub error_recovery: bool,

    /// Rendering mode for responses
    #[arg(long, value_enum)]
    pub print_mode: Option<PrintModeArg>,

    /// Frame with `#<byte-count>` headers instead of one term per line
    #[arg(long)]
    pub length_framing: bool,

    /// TOML file supplying defaults; flags win
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrintModeArg {
    Machine,
    Human,
}
