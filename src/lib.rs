pub mod models;
pub mod services;

pub use models::{AnalysisContext, Category, DetectionResult, RiskLevel, Severity};
pub use services::config_store::{AppConfig, ConfigStore, LoggingConfig};
pub use services::detection::{DetectionEngine, DetectionStats};
pub use services::moderation::{EscalationEngine, ModerationError, ModerationPolicy, ModerationRecords};
pub use services::suggestions::RephrasingEngine;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

const LOG_FILE_PREFIX: &str = "typeaware_";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_FILE: OnceLock<Option<PathBuf>> = OnceLock::new();

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Initialize logging with a timestamped log file. Only the first call does
/// anything; later calls return the same log file path. If the host already
/// installed a global subscriber, that subscriber is left in place.
pub fn init_logging(config: &LoggingConfig) -> Option<PathBuf> {
    LOG_FILE.get_or_init(|| install_subscriber(config)).clone()
}

fn install_subscriber(config: &LoggingConfig) -> Option<PathBuf> {
    // RUST_LOG wins over the configured level.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let file_logging = config.file_logging && !env_flag("TYPEAWARE_DISABLE_FILE_LOG");
    let logs_dir = match std::env::var("TYPEAWARE_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => config.log_dir.clone().unwrap_or_else(default_logs_dir),
    };

    let log_file = if file_logging {
        match fs::create_dir_all(&logs_dir) {
            Ok(()) => {
                let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
                Some(format!("{}{}.log", LOG_FILE_PREFIX, timestamp))
            }
            Err(e) => {
                eprintln!("Failed to create logs directory {}: {}", logs_dir.display(), e);
                None
            }
        }
    } else {
        None
    };

    // One file per session; writes go through a non-blocking worker.
    let file_layer = log_file.as_ref().map(|name| {
        let (file_writer, file_guard) = tracing_appender::non_blocking(rolling::never(&logs_dir, name));
        let _ = LOG_GUARD.set(file_guard);
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    if !installed {
        warn!("[logging] global subscriber already set, keeping it");
        return None;
    }

    info!("=== TypeAware core logging started ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let log_path = log_file.map(|name| logs_dir.join(name))?;
    info!("Log file: {}", log_path.display());

    if !env_flag("TYPEAWARE_DISABLE_LOG_CLEANUP") {
        let keep = config.keep_files;
        // Best-effort, off the caller's thread.
        std::thread::spawn(move || cleanup_old_logs(&logs_dir, keep));
    }

    Some(log_path)
}

/// Default logs directory under the platform's local data dir.
fn default_logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("typeaware").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Delete all but the `keep` most recently modified session logs.
fn cleanup_old_logs(logs_dir: &Path, keep: usize) -> usize {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return 0,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return 0;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    entries
        .into_iter()
        .take(remove_count)
        .filter(|entry| fs::remove_file(entry.path()).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_session_logs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("{}2024010{}_000000.log", LOG_FILE_PREFIX, i)), "x").unwrap();
        }
        fs::write(dir.path().join("other.log"), "x").unwrap();

        assert_eq!(cleanup_old_logs(dir.path(), 2), 3);
        let remaining = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(remaining, 3);
        assert!(dir.path().join("other.log").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 1), 0);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig {
            file_logging: false,
            ..LoggingConfig::default()
        };
        let first = init_logging(&config);
        let second = init_logging(&config);
        assert_eq!(first, second);
        assert!(first.is_none());
    }
}
