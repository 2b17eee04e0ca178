//! Tracing subscriber setup for the GeoTrack binaries.
//!
//! Call [`init_from_config`] once at process start. Crates log through the
//! `tracing` macros directly with structured fields.

use geotrack_config::LoggingConfig;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber with a specific log level for the
/// `geotrack` crates. `RUST_LOG` directives still apply on top.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(console_layer())
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!(%level, "Logging initialized");
    }
}

/// Initialize logging from the `logging` config section.
///
/// When `directory` is set, a daily rolling file is written there as well. The
/// returned guard flushes the file writer and must be held until shutdown.
pub fn init_from_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = parse_level(&config.level);

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "geotrack.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let result = tracing_subscriber::registry()
                .with(console_layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(build_filter(level))
                .try_init();
            if result.is_ok() {
                info!(%level, directory = %directory, "Logging initialized with file output");
            }
            Some(guard)
        }
        None => {
            init_with_level(level);
            None
        }
    }
}

/// Parses a level name, falling back to INFO.
pub fn parse_level(level: &str) -> Level {
    level.parse::<Level>().unwrap_or(Level::INFO)
}

fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
}

fn build_filter(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("geotrack={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Log a result, with different messages for success and error cases.
///
/// Returns the original result so it can be used in a chain.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => error!(error = %e, "{}", error_context),
    }
    result
}
