use crate::models::error::SError;
use camino::Utf8Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Logs to a daily rolling file in `log_dir` and echoes warnings to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Keep the guard alive until exit,
/// dropping it flushes the file writer.
pub fn init(log_dir: &Utf8Path, level: &str) -> Result<WorkerGuard, SError> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, "mod-deployer.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| SError::ParseError(e.to_string()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_filter(LevelFilter::WARN),
        )
        .try_init()
        .map_err(|e| SError::Unexpected(e.to_string()))?;

    Ok(guard)
}
