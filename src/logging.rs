//! File logging setup.
//!
//! Output goes to a daily rolling file so it never interleaves with the shell.
//! The returned guard must live as long as the process or buffered lines are lost.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "todoq.log";
const LOG_ENV: &str = "TODOQ_LOG";

/// Default filter: quiet HTTP internals, verbose for this crate.
fn default_env_filter() -> EnvFilter {
  EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn,todoq=debug")
}

pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir).map_err(|e| {
    eyre!(
      "Failed to create log directory {}: {}",
      log_dir.display(),
      e
    )
  })?;

  let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_env_filter());

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
