//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting

use anyhow::{Context, anyhow};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    init_logging(cmd.verbose, cmd.log_file.as_deref())?;
    cmd.run().await
}

/// `RUST_LOG` wins; otherwise warnings only, or info with `--verbose`.
///
/// Events go to stderr and, with `--log-file`, are appended to that file too.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("weather={level},weather_core={level}").into());

    let file_layer = match log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name)
                .build(&dir)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Directory and file name of a log path; a bare name lives in the working directory.
fn split_log_path(path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_log_name_goes_to_working_directory() {
        let (dir, name) = split_log_path(Path::new("api.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "api.log");
    }

    #[test]
    fn log_path_keeps_its_directory() {
        let (dir, name) = split_log_path(Path::new("/var/log/weather/api.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/weather"));
        assert_eq!(name, "api.log");
    }

    #[test]
    fn log_path_without_file_name_is_rejected() {
        assert!(split_log_path(Path::new("/")).is_err());
        assert!(split_log_path(Path::new("logs/..")).is_err());
    }
}
