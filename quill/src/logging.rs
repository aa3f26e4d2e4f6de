//! Logging bootstrap: a `fern`-based dispatcher writing timestamped lines
//! to a file, with an optional stderr mirror. Library crates never call
//! this - only a host application, or a test harness that wants
//! diagnostic output, does.

use std::path::Path;

use log::LevelFilter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to install logger: {0}")]
    SetLogger(#[from] log::SetLoggerError),
}

/// Installs a process-global `fern` dispatcher writing to `log_file`, and
/// additionally to stderr when `mirror_to_stderr` is set (useful under a
/// host's own terminal, not useful once embedded in a GUI without a
/// console). `level`, when not given explicitly, falls back to the
/// `QUILL_LOG_LEVEL` environment variable.
pub fn init(log_file: &Path, level: Option<LevelFilter>, mirror_to_stderr: bool) -> Result<(), LoggingError> {
    let level = level.unwrap_or_else(level_from_env);

    if let Some(parent) = log_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut dispatch = fern::Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {} [{}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(fern::log_file(log_file)?);

    if mirror_to_stderr {
        dispatch = dispatch.chain(std::io::stderr());
    }

    dispatch.apply()?;
    Ok(())
}

fn level_from_env() -> LevelFilter {
    std::env::var("QUILL_LOG_LEVEL")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LevelFilter::Info)
}
