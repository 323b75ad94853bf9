//! Log output for the CLI.
//!
//! Reply text owns stdout, so console logs go to stderr. Setting
//! `SPART_JSON_LOG_PATH` sends JSON lines to that file instead.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "spart.logs.jsonl";

static LOGGING: OnceCell<()> = OnceCell::new();

/// Destination of log records.
#[derive(Debug, PartialEq, Eq)]
enum LogSink {
    Off,
    Stderr,
    JsonFile(PathBuf),
}

impl LogSink {
    /// An unrecognised `enabled` value keeps logging on.
    fn from_vars(enabled: Option<&str>, json_path: Option<&str>) -> Self {
        if enabled.and_then(parse_flag) == Some(false) {
            return Self::Off;
        }
        match json_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => Self::JsonFile(PathBuf::from(path)),
            None => Self::Stderr,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// `SPART_LOG_LEVEL` first, then `RUST_LOG`, then `warn`.
fn filter_from(level: Option<&str>) -> EnvFilter {
    level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn split_log_path(path: &Path) -> (&Path, &str) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    (dir, file)
}

/// Installs the global subscriber on the first call.
///
/// Reads `SPART_LOG_ENABLED`, `SPART_LOG_LEVEL` and `SPART_JSON_LOG_PATH`.
pub fn init() {
    LOGGING.get_or_init(|| {
        let var = |key: &str| std::env::var(key).ok();
        let sink = LogSink::from_vars(
            var("SPART_LOG_ENABLED").as_deref(),
            var("SPART_JSON_LOG_PATH").as_deref(),
        );
        install(sink, filter_from(var("SPART_LOG_LEVEL").as_deref()));
    });
}

fn install(sink: LogSink, filter: EnvFilter) {
    let registry = tracing_subscriber::registry().with(filter);
    match sink {
        LogSink::Off => {}
        LogSink::Stderr => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = registry.with(layer).try_init();
        }
        LogSink::JsonFile(path) => {
            let (dir, file) = split_log_path(&path);
            let _ = std::fs::create_dir_all(dir);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file));
            let _ = registry.with(layer).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_follows_enable_flag_and_json_path() {
        assert_eq!(LogSink::from_vars(None, None), LogSink::Stderr);
        assert_eq!(LogSink::from_vars(Some(" Off "), Some("/tmp/x.jsonl")), LogSink::Off);
        assert_eq!(LogSink::from_vars(Some("maybe"), Some("  ")), LogSink::Stderr);
        assert_eq!(
            LogSink::from_vars(Some("yes"), Some("logs/spart.jsonl")),
            LogSink::JsonFile(PathBuf::from("logs/spart.jsonl"))
        );
    }

    #[test]
    fn bare_file_name_logs_to_working_directory() {
        assert_eq!(
            split_log_path(Path::new("spart.jsonl")),
            (Path::new("."), "spart.jsonl")
        );
        assert_eq!(
            split_log_path(Path::new("/var/log/spart/out.jsonl")),
            (Path::new("/var/log/spart"), "out.jsonl")
        );
    }

    #[test]
    fn explicit_level_wins() {
        assert_eq!(filter_from(Some("debug")).to_string(), "debug");
    }
}
