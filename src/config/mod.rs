//! Configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, `CHATDEDUP_CONFIG_PATH`, or
//!    `<config_dir>/chatdedup/config.toml`)
//! 3. `CHATDEDUP_*` environment variables
//! 4. Command-line flags
//!
//! # Example file
//!
//! ```toml
//! [scan]
//! text_dedup = true
//! scope_by_author = false
//!
//! [fingerprint]
//! perceptual = true
//! normalize_text = false
//!
//! [export]
//! extension = "jpg"
//! text_log_name = "text-duplicates.log"
//!
//! [session]
//! state_file = "~/.local/state/chatdedup/deduper"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! file = "/var/log/chatdedup.log"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::io::{DEFAULT_TEXT_LOG_NAME, ExtensionPolicy};
use crate::services::dedup::DedupConfig;
use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CHATDEDUP_CONFIG_PATH";

/// Main configuration for chatdedup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupSettings {
    /// Fingerprinting and resolution options.
    pub dedup: DedupConfig,
    /// Export options.
    pub export: ExportSettings,
    /// Session state file, before `~`/`$VAR` expansion.
    pub state_file: Option<String>,
    /// Logging options.
    pub logging: LoggingSettings,
}

/// Export options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Extension policy for duplicate media files.
    pub extension: ExtensionPolicy,
    /// File name of the text-duplicate log.
    pub text_log_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            extension: ExtensionPolicy::default(),
            text_log_name: DEFAULT_TEXT_LOG_NAME.to_string(),
        }
    }
}

/// Logging options as read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `chatdedup=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Scan section.
    pub scan: Option<ConfigFileScan>,
    /// Fingerprint section.
    pub fingerprint: Option<ConfigFileFingerprint>,
    /// Export section.
    pub export: Option<ConfigFileExport>,
    /// Session section.
    pub session: Option<ConfigFileSession>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// `[scan]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileScan {
    /// Fingerprint text messages.
    pub text_dedup: Option<bool>,
    /// Mix the author into every fingerprint.
    pub scope_by_author: Option<bool>,
    /// Skip media messages.
    pub skip_media: Option<bool>,
    /// Report only.
    pub dry_run: Option<bool>,
}

/// `[fingerprint]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFingerprint {
    /// Use the perceptual hash for images.
    pub perceptual: Option<bool>,
    /// Normalize text before hashing.
    pub normalize_text: Option<bool>,
}

/// `[export]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileExport {
    /// A fixed extension, or `"mime"` to derive it from the MIME type.
    pub extension: Option<String>,
    /// Text log file name.
    pub text_log_name: Option<String>,
}

/// `[session]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSession {
    /// Session state file.
    pub state_file: Option<String>,
}

/// `[logging]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// Output format.
    pub format: Option<String>,
    /// Log file.
    pub file: Option<String>,
}

impl DedupSettings {
    /// Loads settings for a run and applies environment overrides.
    ///
    /// An explicit path, or one named by `CHATDEDUP_CONFIG_PATH`, must exist
    /// and parse. The default location is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed,
    /// or if the default file exists but is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let settings = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default()?,
        };
        Ok(settings.with_env_overrides())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads `<config_dir>/chatdedup/config.toml` if it exists.
    fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };
        let path = base_dirs.config_dir().join("chatdedup").join("config.toml");
        if path.is_file() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies `CHATDEDUP_*` overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.dedup = self.dedup.with_env_overrides();
        self
    }

    /// Converts a `ConfigFile` to `DedupSettings`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(scan) = file.scan {
            if let Some(v) = scan.text_dedup {
                config.dedup.text_dedup = v;
            }
            if let Some(v) = scan.scope_by_author {
                config.dedup.scope_by_author = v;
            }
            if let Some(v) = scan.skip_media {
                config.dedup.skip_media = v;
            }
            if let Some(v) = scan.dry_run {
                config.dedup.dry_run = v;
            }
        }
        if let Some(fingerprint) = file.fingerprint {
            if let Some(v) = fingerprint.perceptual {
                config.dedup.perceptual = v;
            }
            if let Some(v) = fingerprint.normalize_text {
                config.dedup.normalize_text = v;
            }
        }
        if let Some(export) = file.export {
            if let Some(ext) = export.extension {
                config.export.extension = parse_extension(&ext);
            }
            if let Some(name) = export.text_log_name {
                config.export.text_log_name = name;
            }
        }
        if let Some(session) = file.session {
            config.state_file = session.state_file;
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }
}

/// `"mime"` selects [`ExtensionPolicy::MimeDerived`]; anything else is a
/// fixed extension with any leading dot removed.
fn parse_extension(value: &str) -> ExtensionPolicy {
    let value = value.trim();
    if value.eq_ignore_ascii_case("mime") {
        ExtensionPolicy::MimeDerived
    } else {
        ExtensionPolicy::Fixed(value.trim_start_matches('.').to_string())
    }
}

/// Expands `~` and `$VAR`/`${VAR}` in a user-supplied path.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if a referenced variable is not set.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| Error::InvalidInput(format!("cannot expand path \"{raw}\": {e}")))
}
