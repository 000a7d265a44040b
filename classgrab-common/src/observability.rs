//! Shared observability helpers for binaries and integration tests.
//!
//! The logging initializer centralises our `tracing` setup so that every
//! binary emits into the same rolling file sink. Call [`init_logging`] once
//! near process start; additional callers are treated as no-ops and simply
//! receive the originally resolved log file.
//!
//! Events with target [`PROGRESS_TARGET`](crate::PROGRESS_TARGET) are the
//! user-facing progress lines. When [`LogConfig::progress`] is set they are
//! printed bare to stdout in addition to the file sink. The console layers do
//! not depend on the file sink: if the log directory cannot be used, progress
//! still reaches stdout and warnings go to stderr.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{filter_fn, Directive, Targets};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::PROGRESS_TARGET;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for defaults and file names).
    pub app_name: &'static str,
    /// Optional explicit directory for log output. If `None`, we consult
    /// `CLASSGRAB_LOG_DIR` and finally fall back to the platform data
    /// directory (`~/.local/share/<app_name>`, `%LOCALAPPDATA%\<app_name>`).
    pub log_dir: Option<PathBuf>,
    /// Whether to duplicate events to `stderr` in addition to the file sink.
    pub emit_stderr: bool,
    /// Whether to print progress lines to `stdout`.
    pub progress: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "classgrab",
            log_dir: None,
            emit_stderr: false,
            progress: true,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// What [`init_logging`] managed to set up.
#[derive(Debug)]
pub struct LogInit {
    /// Log file for the current day, when the file sink is active.
    pub log_file: Option<PathBuf>,
    /// Why the file sink was skipped. Console output is installed regardless.
    pub file_error: Option<anyhow::Error>,
}

/// Initialise the global `tracing` subscriber.
///
/// Only a failure to install the subscriber itself is an error. A log
/// directory that cannot be created is reported through
/// [`LogInit::file_error`]; in that case warnings and errors are also written
/// to `stderr` so they are not lost.
pub fn init_logging(config: LogConfig) -> anyhow::Result<LogInit> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(LogInit {
            log_file: path.clone(),
            file_error: None,
        });
    }

    let (writer, log_file, file_error) =
        match open_file_sink(config.app_name, config.log_dir.as_deref()) {
            Ok((writer, path)) => (Some(writer), Some(path), None),
            Err(err) => (None, None, Some(err)),
        };

    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    if config.progress {
        env_filter = env_filter.add_directive(
            format!("{PROGRESS_TARGET}=info")
                .parse::<Directive>()
                .context("invalid progress directive")?,
        );
    }

    let json = config.format == LogFormat::Json;

    let file_text = writer
        .clone()
        .filter(|_| !json)
        .map(|w| fmt::layer().with_writer(w).with_ansi(false));
    let file_json = writer
        .filter(|_| json)
        .map(|w| fmt::layer().json().with_writer(w));

    // Without a file sink, stderr is the only place left for warnings.
    let stderr_level = if config.emit_stderr {
        LevelFilter::TRACE
    } else {
        LevelFilter::WARN
    };
    let stderr_on = config.emit_stderr || file_error.is_some();
    let stderr_filter =
        filter_fn(move |meta| meta.target() != PROGRESS_TARGET && *meta.level() <= stderr_level);

    let stderr_text = (stderr_on && !json)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_filter(stderr_filter.clone()));
    let stderr_json = (stderr_on && json).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter)
    });

    let progress = config.progress.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .without_time()
            .with_target(false)
            .with_level(false)
            .with_filter(Targets::new().with_target(PROGRESS_TARGET, tracing::Level::INFO))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_text)
        .with(file_json)
        .with(stderr_text)
        .with(stderr_json)
        .with(progress)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(log_file.clone());
    Ok(LogInit {
        log_file,
        file_error,
    })
}

/// Create the log directory and a daily rolling writer inside it.
fn open_file_sink(
    app_name: &str,
    explicit: Option<&Path>,
) -> anyhow::Result<(NonBlocking, PathBuf)> {
    let resolved_dir = resolve_log_dir(app_name, explicit);
    std::fs::create_dir_all(&resolved_dir)
        .with_context(|| format!("failed to create log directory: {}", resolved_dir.display()))?;

    let log_filename = format!("{app_name}.log");
    let today = Local::now().format("%Y-%m-%d").to_string();
    let full_path = resolved_dir.join(format!("{log_filename}.{today}"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&log_filename)
        .build(&resolved_dir)
        .with_context(|| format!("failed to open log file in {}", resolved_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);

    Ok((writer, full_path))
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return expand_home(dir);
    }

    if let Ok(env_dir) = std::env::var("CLASSGRAB_LOG_DIR") {
        return expand_home(Path::new(&env_dir));
    }

    default_data_dir(app_name)
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

fn default_data_dir(app_name: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
}
