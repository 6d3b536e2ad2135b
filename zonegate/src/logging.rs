//! Logging setup.
//!
//! `logger.*` config keys (level, console/json encoding, optional file
//! output) need a richer sink than a bare `env_logger::init()`, so this
//! installs a `tracing-subscriber` pipeline and bridges the `log` facade
//! into it with `tracing-log`, keeping every `log::info!`/`log::error!`
//! call site in the DNS and HTTP handlers unchanged.

use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::LoggerConfig;

/// Must be kept alive for the lifetime of the process when file output is
/// configured; dropping it stops the background flush thread.
pub struct LoggingGuard(#[allow(dead_code)] Option<WorkerGuard>);

pub fn init(cfg: &LoggerConfig) -> LoggingGuard {
    let _ = tracing_log::LogTracer::init();

    let level = LevelFilter::from_str(&cfg.level).unwrap_or(LevelFilter::INFO);
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let json = cfg.encode.eq_ignore_ascii_case("json");
    let ansi = !cfg.no_color;

    let guard = if cfg.output.is_empty() {
        let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_ansi(ansi);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        None
    } else {
        let path = std::path::Path::new(&cfg.output);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "zonegate.log".to_string());
        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(writer);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        Some(guard)
    };

    LoggingGuard(guard)
}
