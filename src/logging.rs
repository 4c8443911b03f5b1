//! `log` bridge for the binary.
//!
//! stdout carries JSON-RPC, so every log line goes to stderr and, when a log
//! file is configured, is appended there too.
//!
//! Level precedence: `--log-level` flag, then `FONTPRESS_LOG`, then
//! `logging.level` from the config file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fontpress_config::LogLevel;
use parking_lot::Mutex;

/// Environment variable overriding the configured log level.
pub const LOG_ENV_VAR: &str = "FONTPRESS_LOG";

struct LogBridge {
    level: log::LevelFilter,
    file: Option<Mutex<File>>,
}

impl LogBridge {
    fn format(record: &log::Record) -> String {
        format!(
            "[{}] [{:<5}] [{}] {}\n",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        if let Some(file) = &self.file {
            let _ = file.lock().write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Pick the effective level. Unparseable env values are ignored.
pub fn resolve_level(
    cli: Option<LogLevel>,
    env: Option<&str>,
    configured: LogLevel,
) -> log::LevelFilter {
    cli.or_else(|| env.and_then(|value| value.parse().ok()))
        .unwrap_or(configured)
        .to_level_filter()
}

/// Install the bridge as the global logger.
pub fn init_log_bridge(level: log::LevelFilter, file: Option<&Path>) -> anyhow::Result<()> {
    let file = match file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let handle = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Mutex::new(handle))
        }
        None => None,
    };

    log::set_boxed_logger(Box::new(LogBridge { level, file }))
        .map_err(|e| anyhow::anyhow!("logger already installed: {e}"))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flag_wins() {
        assert_eq!(
            resolve_level(Some(LogLevel::Trace), Some("error"), LogLevel::Warn),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_env_beats_config() {
        assert_eq!(
            resolve_level(None, Some("debug"), LogLevel::Warn),
            log::LevelFilter::Debug
        );
    }

    #[test]
    fn test_bad_env_falls_back_to_config() {
        assert_eq!(
            resolve_level(None, Some("chatty"), LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(resolve_level(None, None, LogLevel::Off), log::LevelFilter::Off);
    }

    #[test]
    fn test_line_format() {
        let line = LogBridge::format(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("fontpress::publish")
                .args(format_args!("retrying PUT"))
                .build(),
        );
        assert!(line.contains("[WARN ] [fontpress::publish] retrying PUT"));
        assert!(line.ends_with('\n'));
    }
}
