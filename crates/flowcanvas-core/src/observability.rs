use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const ENABLE_KEYS: [&str; 2] = ["FLOWCANVAS_OBSERVABILITY_ENABLED", "FLOWCANVAS_OBSERVABILITY"];
const LOG_LEVEL_KEY: &str = "FLOWCANVAS_LOG_LEVEL";
const JSON_LOG_PATH_KEY: &str = "FLOWCANVAS_JSON_LOG_PATH";
const DEFAULT_LOG_FILE: &str = "flowcanvas.logs.jsonl";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogSink {
    Console,
    JsonFile { dir: PathBuf, file_name: String },
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// First set key wins; unparseable values count as enabled.
fn enabled(lookup: impl Fn(&str) -> Option<String>) -> bool {
    ENABLE_KEYS
        .iter()
        .find_map(|key| lookup(key))
        .map(|v| parse_flag(&v).unwrap_or(true))
        .unwrap_or(true)
}

fn env_filter(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    if let Some(level) = lookup(LOG_LEVEL_KEY)
        && let Ok(filter) = EnvFilter::try_new(level)
    {
        return filter;
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_sink(lookup: impl Fn(&str) -> Option<String>) -> LogSink {
    let Some(raw) = lookup(JSON_LOG_PATH_KEY).filter(|p| !p.trim().is_empty()) else {
        return LogSink::Console;
    };
    let path = PathBuf::from(raw);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    LogSink::JsonFile { dir, file_name }
}

/// Install the global `tracing` subscriber once per process.
///
/// - `FLOWCANVAS_OBSERVABILITY_ENABLED` / `FLOWCANVAS_OBSERVABILITY`: on/off (default on).
/// - `FLOWCANVAS_LOG_LEVEL`, then `RUST_LOG`: filter directives (default `info`).
/// - `FLOWCANVAS_JSON_LOG_PATH`: write JSON lines to this file instead of the console.
///
/// Console output goes to stderr so stdout stays free for command output.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let lookup = |key: &str| std::env::var(key).ok();
        if !enabled(lookup) {
            return;
        }
        let filter = env_filter(lookup);
        match log_sink(lookup) {
            LogSink::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            LogSink::Console => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn enabled_by_default_and_first_key_wins() {
        assert!(enabled(env(&[])));
        assert!(!enabled(env(&[("FLOWCANVAS_OBSERVABILITY", "0")])));
        assert!(enabled(env(&[
            ("FLOWCANVAS_OBSERVABILITY_ENABLED", "true"),
            ("FLOWCANVAS_OBSERVABILITY", "false"),
        ])));
        assert!(enabled(env(&[("FLOWCANVAS_OBSERVABILITY", "garbage")])));
    }

    #[test]
    fn json_path_selects_file_sink() {
        assert_eq!(log_sink(env(&[])), LogSink::Console);
        assert_eq!(
            log_sink(env(&[("FLOWCANVAS_JSON_LOG_PATH", "logs/run.jsonl")])),
            LogSink::JsonFile {
                dir: PathBuf::from("logs"),
                file_name: "run.jsonl".into()
            }
        );
        assert_eq!(
            log_sink(env(&[("FLOWCANVAS_JSON_LOG_PATH", "run.jsonl")])),
            LogSink::JsonFile {
                dir: PathBuf::from("."),
                file_name: "run.jsonl".into()
            }
        );
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
    }
}
