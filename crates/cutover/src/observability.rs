//! Structured logging for release runs.
//!
//! Logging never writes to stdout: stdout carries command output, including
//! `--json` reports, so log lines go to a JSONL file or stderr.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "CUTOVER_LOG_PATH";
const ENV_LOG_DIR: &str = "CUTOVER_LOG_DIR";
const LOG_FILE_SUFFIX: &str = ".jsonl";

/// Configuration for logging setup.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// The service name used for the log file name.
    pub service: String,
    /// Directory for JSONL log files. Falls back to platform defaults if unset.
    pub log_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Create config from environment variables with optional overrides.
    pub fn from_env_with_overrides(log_dir: Option<PathBuf>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            log_dir,
        }
    }
}

#[derive(Clone, Debug)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
}

impl LogTarget {
    #[cfg(test)]
    fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Guard that must be held for the lifetime of the application so buffered
/// log lines are flushed on exit.
pub struct ObservabilityGuard {
    _log_guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize logging.
///
/// Returns a guard that must be held for the application lifetime.
///
/// # Errors
///
/// Returns an error if the subscriber cannot be installed.
pub fn init_observability(
    cfg: &ObservabilityConfig,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let (log_writer, log_guard) = match build_log_writer(&cfg.service, cfg.log_dir.as_deref()) {
        Ok(result) => result,
        Err(err) => {
            // stdout is reserved for reports; degrade to stderr, never stdout.
            eprintln!("Warning: {err}. Falling back to stderr logging.");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    let log_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(log_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .init();

    tracing::debug!("logging initialized");

    Ok(ObservabilityGuard {
        _log_guard: log_guard,
    })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    if verbose > 0 {
        let level = match verbose {
            1 => "debug",
            _ => "trace",
        };
        return EnvFilter::new(level);
    }

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

// ──────────────────────────────────────────────
// Log target resolution
// ──────────────────────────────────────────────

fn build_log_writer(
    service: &str,
    config_log_dir: Option<&Path>,
) -> Result<(
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
)> {
    let target = resolve_log_target(service, config_log_dir).map_err(|e| anyhow::anyhow!("{e}"))?;

    let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    Ok((writer, guard))
}

fn resolve_log_target(service: &str, config_log_dir: Option<&Path>) -> Result<LogTarget, String> {
    let path_override = std::env::var_os(ENV_LOG_PATH).map(PathBuf::from);
    let dir_override = std::env::var_os(ENV_LOG_DIR).map(PathBuf::from);

    resolve_log_target_with(
        service,
        path_override,
        dir_override,
        config_log_dir.map(PathBuf::from),
    )
}

fn resolve_log_target_with(
    service: &str,
    path_override: Option<PathBuf>,
    dir_override: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Result<LogTarget, String> {
    if let Some(path) = path_override {
        return log_target_from_path(path);
    }

    if let Some(dir) = dir_override {
        return log_target_from_dir(dir, service);
    }

    if let Some(dir) = config_dir {
        return log_target_from_dir(dir, service);
    }

    // A release tool runs as the invoking user, so the log lands in the
    // XDG data directory. There is no working-directory fallback: a log
    // file must never dirty the tree being released.
    let dir = directories::ProjectDirs::from("", "", service)
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .ok_or_else(|| "No writable log directory found".to_string())?;

    let file_name = format!("{service}{LOG_FILE_SUFFIX}");
    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget { dir, file_name })
}

fn log_target_from_dir(dir: PathBuf, service: &str) -> Result<LogTarget, String> {
    let file_name = format!("{service}{LOG_FILE_SUFFIX}");
    ensure_writable(&dir, &file_name)?;
    Ok(LogTarget { dir, file_name })
}

fn log_target_from_path(path: PathBuf) -> Result<LogTarget, String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| format!("{ENV_LOG_PATH} must include a file name"))
        .and_then(|name| {
            name.to_str()
                .map(|value| value.to_string())
                .ok_or_else(|| format!("{ENV_LOG_PATH} must be valid UTF-8"))
        })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_writable(dir, &file_name)?;

    Ok(LogTarget {
        dir: dir.to_path_buf(),
        file_name,
    })
}

fn ensure_writable(dir: &Path, file_name: &str) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create log directory {}: {e}", dir.display()))?;

    let path = dir.join(file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;

    Ok(())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_quiet_overrides() {
        let filter = env_filter(true, 0, "info");
        assert_eq!(filter.to_string(), "error");
    }

    #[test]
    fn env_filter_verbose_maps_to_debug_and_trace() {
        let debug_filter = env_filter(false, 1, "info");
        assert_eq!(debug_filter.to_string(), "debug");

        let trace_filter = env_filter(false, 2, "info");
        assert_eq!(trace_filter.to_string(), "trace");
    }

    #[test]
    fn log_target_from_path_uses_parent_dir() {
        let temp_dir = std::env::temp_dir().join("cutover-log-path");
        let file_path = temp_dir.join("custom.jsonl");

        let target = log_target_from_path(file_path).expect("log target from path");
        assert_eq!(target.dir, temp_dir);
        assert_eq!(target.file_name, "custom.jsonl");
    }

    #[test]
    fn log_target_from_dir_appends_file_name() {
        let temp_dir = std::env::temp_dir().join("cutover-log-dir");
        let target = log_target_from_dir(temp_dir.clone(), "demo").expect("log target from dir");
        assert_eq!(target.dir, temp_dir);
        assert_eq!(target.file_name, format!("demo{LOG_FILE_SUFFIX}"));
    }

    #[test]
    fn resolve_log_target_with_prefers_path_override() {
        let temp_dir = std::env::temp_dir().join("cutover-log-override");
        let file_path = temp_dir.join("override.jsonl");

        let target = resolve_log_target_with("demo", Some(file_path.clone()), None, None)
            .expect("override log target");

        assert_eq!(target.path(), file_path);
    }

    #[test]
    fn resolve_log_target_with_falls_back_to_dir_override() {
        let temp_dir = std::env::temp_dir().join("cutover-log-dir-override");
        let target = resolve_log_target_with("demo", None, Some(temp_dir.clone()), None)
            .expect("dir override log target");

        assert_eq!(target.dir, temp_dir);
        assert_eq!(target.file_name, format!("demo{LOG_FILE_SUFFIX}"));
    }

    #[test]
    fn resolve_log_target_with_uses_config_dir() {
        let temp_dir = std::env::temp_dir().join("cutover-log-config-dir");
        let target = resolve_log_target_with("demo", None, None, Some(temp_dir.clone()))
            .expect("config dir log target");

        assert_eq!(target.dir, temp_dir);
        assert_eq!(target.file_name, format!("demo{LOG_FILE_SUFFIX}"));
    }
}
