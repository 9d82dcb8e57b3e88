//! Structured logging with two independent streams — framework diagnostics and
//! application/handler diagnostics — sharing one rotation policy but writing to
//! distinct files, both driven by `tracing-appender`'s background worker thread.
//!
//! Framework code logs with the ordinary `tracing::{debug,info,error}!` macros.
//! Application/handler code should prefer [`app_debug`]/[`app_info`]/[`app_error`],
//! which tag the event with the `"app"` target so it routes to the application stream
//! instead of the framework one.

#![deny(missing_debug_implementations, rust_2018_idioms, unused_imports)]

mod format;
mod rotate;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use config::{Config, LogLevel};
use format::RapidFormat;
use rotate::RotatingWriter;

/// Events tagged with this target are routed to the application stream.
pub const APP_TARGET: &str = "app";

/// Keeps the background writer threads alive. Must be held for the process's
/// lifetime; dropping it flushes and joins both writer threads.
#[must_use = "dropping the guards stops the background log writers"]
pub struct LoggingGuards {
    _framework: WorkerGuard,
    _app: WorkerGuard,
}

impl std::fmt::Debug for LoggingGuards {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingGuards").finish()
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// Installs the process-wide tracing subscriber per `config`'s log settings. Must run
/// once, before any worker thread starts; the returned guards must be kept alive for
/// as long as logging is needed.
pub fn init(config: &Config) -> LoggingGuards {
    let framework_writer = RotatingWriter::new(format!("{}_rpc", config.log_file_name), &config.log_file_path, config.log_max_file_size);
    let app_writer = RotatingWriter::new(format!("{}_app", config.log_file_name), &config.log_file_path, config.log_max_file_size);

    let (framework_nb, framework_guard) = tracing_appender::non_blocking(framework_writer);
    let (app_nb, app_guard) = tracing_appender::non_blocking(app_writer);

    let framework_layer = fmt::layer()
        .event_format(RapidFormat)
        .with_writer(framework_nb)
        .with_filter(filter_fn(|metadata| metadata.target() != APP_TARGET));

    let app_layer = fmt::layer()
        .event_format(RapidFormat)
        .with_writer(app_nb)
        .with_filter(filter_fn(|metadata| metadata.target() == APP_TARGET));

    tracing_subscriber::registry()
        .with(level_filter(config.log_level))
        .with(framework_layer)
        .with(app_layer)
        .init();

    LoggingGuards {
        _framework: framework_guard,
        _app: app_guard,
    }
}

/// Logs to the application stream at debug level.
#[macro_export]
macro_rules! app_debug {
    ($($arg:tt)*) => { tracing::debug!(target: $crate::APP_TARGET, $($arg)*) };
}

/// Logs to the application stream at info level.
#[macro_export]
macro_rules! app_info {
    ($($arg:tt)*) => { tracing::info!(target: $crate::APP_TARGET, $($arg)*) };
}

/// Logs to the application stream at error level.
#[macro_export]
macro_rules! app_error {
    ($($arg:tt)*) => { tracing::error!(target: $crate::APP_TARGET, $($arg)*) };
}
