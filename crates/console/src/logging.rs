use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "hackaware.log";
const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

#[derive(Debug, PartialEq, Eq)]
enum LogSink {
    Stderr,
    DailyFile(PathBuf),
}

fn log_sink(log_dir: &Path, log_to_stderr: bool) -> LogSink {
    if log_to_stderr {
        LogSink::Stderr
    } else {
        LogSink::DailyFile(log_dir.to_path_buf())
    }
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Output goes to exactly one sink so the
/// rendered transcript on stdout stays clean; keep the guard alive until exit
/// or buffered lines are lost.
pub(crate) fn init_tracing(log_dir: &Path, log_to_stderr: bool) -> anyhow::Result<WorkerGuard> {
    match log_sink(log_dir, log_to_stderr) {
        LogSink::Stderr => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            tracing_subscriber::fmt()
                .with_env_filter(log_filter())
                .with_writer(writer)
                .with_target(false)
                .init();
            Ok(guard)
        }
        LogSink::DailyFile(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(log_filter())
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .init();
            Ok(guard)
        }
    }
}
