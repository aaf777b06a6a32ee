use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of the rolling log files, `ocrgrep.log.YYYY-MM-DD`.
const LOG_FILE_NAME: &str = "ocrgrep.log";

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Filter for `level`, unless `RUST_LOG` is set.
///
/// `level` may be a bare level or a full directive list
/// (`info,ocrgrep_worker=debug`). Anything else falls back to `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| directives(level))
}

fn directives(level: &str) -> EnvFilter {
    let level = level.trim().to_ascii_lowercase();
    let plausible = level.contains('=') || LEVELS.contains(&level.as_str());
    if plausible {
        if let Ok(filter) = EnvFilter::try_new(&level) {
            return filter;
        }
    }
    EnvFilter::new("info")
}

/// Initialize the global logger.
///
/// Creates a console logger, and a JSON file logger when `log_dir` is given.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let env_filter = build_filter(level);

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_and_directives_are_kept() {
        assert_eq!(directives("debug").to_string(), "debug");
        assert_eq!(directives(" WARN ").to_string(), "warn");
        assert!(directives("info,ocrgrep_worker=trace")
            .to_string()
            .contains("ocrgrep_worker=trace"));
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(directives("loud").to_string(), "info");
        assert_eq!(directives("").to_string(), "info");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logger(None, "info");
        init_logger(None, "debug");
        tracing::info!("still logging");
    }
}
