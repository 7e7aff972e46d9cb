//! Logging configuration.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name. Unknown names fall back to [`LogFormat::Pretty`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
    /// Level filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Resolves logging from config settings and the environment.
    ///
    /// Filter precedence: `CHATDEDUP_LOG`, `RUST_LOG`, `-v` (debug), the
    /// config file level, then `warn`. `CHATDEDUP_LOG_FORMAT` and
    /// `CHATDEDUP_LOG_FILE` override the file settings.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let format = std::env::var("CHATDEDUP_LOG_FORMAT")
            .ok()
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map(|f| LogFormat::parse(&f))
            .unwrap_or_default();

        let file = std::env::var_os("CHATDEDUP_LOG_FILE")
            .map(PathBuf::from)
            .or_else(|| settings.and_then(|s| s.file.clone()));

        let fallback = if verbose {
            "debug".to_string()
        } else {
            settings
                .and_then(|s| s.level.clone())
                .unwrap_or_else(|| "warn".to_string())
        };
        let filter = std::env::var("CHATDEDUP_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| build_filter(&fallback));

        Self {
            format,
            file,
            filter,
        }
    }
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}
