//! Startup configuration: flags over an optional TOML file.
//!
//! Resolution order is flag, then file, then default. The result is
//! one immutable `Config`; violations are `ConfigError` and fatal
//! before the server starts serving.

use std::path::{Path, PathBuf};

use cairn_sexp::{Framing, PrintMode};

use crate::cli::{Cli, PrintModeArg};

pub const MAX_WORKERS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file `{path}`: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config file `{path}`: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("worker count {requested} exceeds the limit of {max}")]
    TooManyWorkers { requested: usize, max: usize },

    #[error("stdlib path `{path}` does not exist")]
    StdlibMissing { path: String },

    #[error("unknown print mode `{0}` in config file (expected `machine` or `human`)")]
    BadPrintMode(String),
}

/// File-side settings; every field optional so the file only states
/// what it wants to override.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    stdlib: Option<PathBuf>,
    #[serde(default)]
    load_paths: Vec<PathBuf>,
    prelude: Option<bool>,
    workers: Option<usize>,
    error_recovery: Option<bool>,
    print_mode: Option<String>,
    length_framing: Option<bool>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// The validated, immutable startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub stdlib: Option<PathBuf>,
    pub load_paths: Vec<PathBuf>,
    pub prelude: bool,
    pub workers: usize,
    pub error_recovery: bool,
    pub print_mode: PrintMode,
    pub framing: Framing,
}

impl Config {
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let print_mode = match cli.print_mode {
            Some(PrintModeArg::Machine) => PrintMode::Machine,
            Some(PrintModeArg::Human) => PrintMode::Human,
            None => match file.print_mode.as_deref() {
                Some("machine") | None => PrintMode::Machine,
                Some("human") => PrintMode::Human,
                Some(other) => return Err(ConfigError::BadPrintMode(other.to_string())),
            },
        };

        let workers = cli.async_workers.or(file.workers).unwrap_or(0);
        if workers > MAX_WORKERS {
            return Err(ConfigError::TooManyWorkers {
                requested: workers,
                max: MAX_WORKERS,
            });
        }

        let stdlib = cli.stdlib.clone().or(file.stdlib);
        if let Some(path) = &stdlib
            && !path.exists()
        {
            return Err(ConfigError::StdlibMissing {
                path: path.display().to_string(),
            });
        }

        let mut load_paths = file.load_paths;
        load_paths.extend(cli.load_path.iter().cloned());

        let prelude = if cli.no_prelude {
            false
        } else {
            file.prelude.unwrap_or(true)
        };

        let length_framing = cli.length_framing || file.length_framing.unwrap_or(false);

        Ok(Self {
            stdlib,
            load_paths,
            prelude,
            workers,
            error_recovery: cli.error_recovery || file.error_recovery.unwrap_or(false),
            print_mode,
            framing: if length_framing {
                Framing::Length
            } else {
                Framing::Line
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["cairn"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    struct TempFile {
        path: PathBuf,
    }

    impl TempFile {
        fn new(name: &str, contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "cairn-config-{}-{name}",
                std::process::id()
            ));
            std::fs::write(&path, contents).expect("temp config should be written");
            Self { path }
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[test]
    fn defaults_are_synchronous_line_framed_machine_mode() {
        let config = Config::resolve(&cli(&[])).expect("resolve");
        assert_eq!(config.workers, 0);
        assert!(config.prelude);
        assert!(!config.error_recovery);
        assert_eq!(config.print_mode, PrintMode::Machine);
        assert_eq!(config.framing, Framing::Line);
    }

    #[test]
    fn file_supplies_defaults_and_flags_win() {
        let file = TempFile::new(
            "merge.toml",
            "workers = 4\nprint_mode = \"human\"\nerror_recovery = true\n",
        );
        let path = file.path.to_string_lossy().into_owned();

        let config = Config::resolve(&cli(&["--config", &path])).expect("resolve");
        assert_eq!(config.workers, 4);
        assert_eq!(config.print_mode, PrintMode::Human);
        assert!(config.error_recovery);

        let config = Config::resolve(&cli(&[
            "--config",
            &path,
            "--async-workers",
            "2",
            "--print-mode",
            "machine",
        ]))
        .expect("resolve");
        assert_eq!(config.workers, 2);
        assert_eq!(config.print_mode, PrintMode::Machine);
    }

    #[test]
    fn worker_limit_is_enforced() {
        let err = Config::resolve(&cli(&["--async-workers", "100"])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooManyWorkers {
                requested: 100,
                max: MAX_WORKERS,
            }
        ));
    }

    #[test]
    fn missing_stdlib_path_is_rejected() {
        let err =
            Config::resolve(&cli(&["--stdlib", "/nonexistent/cairn-stdlib"])).unwrap_err();
        assert!(matches!(err, ConfigError::StdlibMissing { .. }));
    }

    #[test]
    fn bad_print_mode_in_file_is_rejected() {
        let file = TempFile::new("badmode.toml", "print_mode = \"fancy\"\n");
        let path = file.path.to_string_lossy().into_owned();
        let err = Config::resolve(&cli(&["--config", &path])).unwrap_err();
        assert!(matches!(err, ConfigError::BadPrintMode(_)));
    }

    #[test]
    fn no_prelude_overrides_the_file() {
        let file = TempFile::new("prelude.toml", "prelude = true\n");
        let path = file.path.to_string_lossy().into_owned();
        let config =
            Config::resolve(&cli(&["--config", &path, "--no-prelude"])).expect("resolve");
        assert!(!config.prelude);
    }
}
