//! Logger initialization.
//!
//! Plain output marks each line with the pipeline stage that emitted it
//! (fetch, evaluation, registry, orchestration), so a batch log reads as a
//! per-host trace. JSON output emits one object per line with the same stage
//! as a field.

use std::io::Write;

use colored::*;
use log::{Level, LevelFilter};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Pipeline stage a log target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fetch,
    Evaluate,
    Registry,
    Orchestrate,
    Other,
}

impl Stage {
    fn of(target: &str) -> Self {
        let module = target.strip_prefix("chain_status::").unwrap_or(target);
        match module.split("::").next().unwrap_or(module) {
            "tls" | "tokio_rustls" | "rustls" => Stage::Fetch,
            "policy" | "certificate" | "score" => Stage::Evaluate,
            "storage" | "sqlx" => Stage::Registry,
            "verify" | "host" | "chain_status" => Stage::Orchestrate,
            _ => Stage::Other,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Evaluate => "evaluate",
            Stage::Registry => "registry",
            Stage::Orchestrate => "verify",
            Stage::Other => "other",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Stage::Fetch => "🔒",
            Stage::Evaluate => "🛡️",
            Stage::Registry => "💾",
            Stage::Orchestrate => "🔗",
            Stage::Other => "•",
        }
    }
}

fn json_line(ts_ms: i64, level: Level, target: &str, msg: &str) -> String {
    serde_json::json!({
        "ts": ts_ms,
        "level": level.as_str(),
        "stage": Stage::of(target).label(),
        "target": target,
        "msg": msg,
    })
    .to_string()
}

fn plain_line(level: Level, target: &str, msg: &str) -> String {
    let colored_level = match level {
        Level::Error => level.as_str().red(),
        Level::Warn => level.as_str().yellow(),
        Level::Info => level.as_str().green(),
        Level::Debug => level.as_str().blue(),
        Level::Trace => level.as_str().purple(),
    };
    let stage = Stage::of(target);
    format!(
        "{} {:<8} [{}] {}",
        stage.marker(),
        stage.label().cyan(),
        colored_level,
        msg
    )
}

/// Initializes the logger with the specified level and format.
///
/// `RUST_LOG` is read first; `level` then applies to this crate. TLS and
/// database internals are held at `warn`.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// ```bash
/// RUST_LOG=sqlx=debug chain_status check example.com --log-level debug
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for noisy in ["sqlx", "rustls", "tokio_rustls"] {
        builder.filter_module(noisy, LevelFilter::Warn);
    }
    builder.filter_module("chain_status", level);

    match format {
        LogFormat::Json => builder.format(|buf, record| {
            writeln!(
                buf,
                "{}",
                json_line(
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                )
            )
        }),
        LogFormat::Plain => builder.format(|buf, record| {
            writeln!(
                buf,
                "{}",
                plain_line(record.level(), record.target(), &record.args().to_string())
            )
        }),
    };

    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}
