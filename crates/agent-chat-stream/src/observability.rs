use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_VAR: &str = "AGENT_CHAT_OBSERVABILITY_ENABLED";
const LEVEL_VAR: &str = "AGENT_CHAT_LOG_LEVEL";
const JSON_PATH_VAR: &str = "AGENT_CHAT_JSON_LOG_PATH";
const DEFAULT_JSON_FILE: &str = "agent-chat.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log records go.
#[derive(Debug, PartialEq, Eq)]
enum LogOutput {
    Disabled,
    /// Compact lines on stderr, leaving stdout to streamed replies.
    Console,
    /// JSON lines appended to a file.
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogOutput {
    fn resolve(enabled: Option<&str>, json_path: Option<&str>) -> Self {
        if enabled.and_then(parse_bool_env) == Some(false) {
            return Self::Disabled;
        }
        match json_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => {
                let path = Path::new(path);
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_JSON_FILE)
                    .to_string();
                Self::JsonFile { dir, file_name }
            }
            None => Self::Console,
        }
    }

    fn from_env() -> Self {
        Self::resolve(
            std::env::var(ENABLED_VAR).ok().as_deref(),
            std::env::var(JSON_PATH_VAR).ok().as_deref(),
        )
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    std::env::var(LEVEL_VAR)
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

/// Installs the global subscriber once per process; later calls are no-ops.
///
/// Reads `AGENT_CHAT_OBSERVABILITY_ENABLED` (default on),
/// `AGENT_CHAT_LOG_LEVEL` then `RUST_LOG` for the filter, falling back to
/// `default_level`, and `AGENT_CHAT_JSON_LOG_PATH` to log JSON lines to a
/// file instead of stderr.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        let filter = env_filter(default_level);
        match LogOutput::from_env() {
            LogOutput::Disabled => {}
            LogOutput::Console => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            LogOutput::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}
