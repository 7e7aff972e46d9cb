//! Dedup engine configuration.
//!
//! Controls which content kinds are fingerprinted, how fingerprints are
//! derived, and whether resolution deletes anything.

/// Configuration for the fingerprinting and resolution passes.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `CHATDEDUP_TEXT_DEDUP` | bool | `false` | Fingerprint text messages |
/// | `CHATDEDUP_SCOPE_BY_AUTHOR` | bool | `false` | Mix the author into every fingerprint |
/// | `CHATDEDUP_SKIP_MEDIA` | bool | `false` | Skip media messages entirely |
///
/// # Example
///
/// ```rust
/// use chatdedup::services::dedup::DedupConfig;
///
/// let config = DedupConfig::default();
/// assert!(!config.dry_run);
/// assert!(config.perceptual);
/// assert!(!config.text_dedup);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DedupConfig {
    /// Report only; never issue delete requests.
    pub dry_run: bool,

    /// Fingerprint text messages into the text namespace.
    pub text_dedup: bool,

    /// Mix the author identifier into every fingerprint.
    pub scope_by_author: bool,

    /// Do not fingerprint media messages.
    pub skip_media: bool,

    /// Use the perceptual hash for decodable images.
    ///
    /// When disabled, every media payload is fingerprinted by content hash.
    pub perceptual: bool,

    /// Normalize text (trim, lowercase, collapse whitespace) before hashing.
    pub normalize_text: bool,
}

impl DedupConfig {
    /// Applies the `CHATDEDUP_*` environment overrides on top of `self`.
    ///
    /// Unset or unparseable variables leave the current value untouched.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_bool("CHATDEDUP_TEXT_DEDUP") {
            self.text_dedup = v;
        }
        if let Some(v) = env_bool("CHATDEDUP_SCOPE_BY_AUTHOR") {
            self.scope_by_author = v;
        }
        if let Some(v) = env_bool("CHATDEDUP_SKIP_MEDIA") {
            self.skip_media = v;
        }
        self
    }

    /// Builder method to set dry-run.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builder method to enable text fingerprinting.
    #[must_use]
    pub const fn with_text_dedup(mut self, enabled: bool) -> Self {
        self.text_dedup = enabled;
        self
    }

    /// Builder method to enable author scoping.
    #[must_use]
    pub const fn with_scope_by_author(mut self, enabled: bool) -> Self {
        self.scope_by_author = enabled;
        self
    }

    /// Builder method to skip media messages.
    #[must_use]
    pub const fn with_skip_media(mut self, skip: bool) -> Self {
        self.skip_media = skip;
        self
    }

    /// Builder method to toggle the perceptual hash.
    #[must_use]
    pub const fn with_perceptual(mut self, enabled: bool) -> Self {
        self.perceptual = enabled;
        self
    }

    /// Builder method to toggle text normalization.
    #[must_use]
    pub const fn with_normalize_text(mut self, enabled: bool) -> Self {
        self.normalize_text = enabled;
        self
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            text_dedup: false,
            scope_by_author: false,
            skip_media: false,
            perceptual: true,
            normalize_text: false,
        }
    }
}

/// Parses a boolean environment variable (`1`/`true`/`yes`/`on` and their
/// negatives, case-insensitive).
fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = DedupConfig::default();

        assert!(!config.dry_run);
        assert!(!config.text_dedup);
        assert!(!config.scope_by_author);
        assert!(!config.skip_media);
        assert!(config.perceptual);
        assert!(!config.normalize_text);
    }

    #[test]
    fn test_builder_methods() {
        let config = DedupConfig::default()
            .with_dry_run(true)
            .with_text_dedup(true)
            .with_scope_by_author(true)
            .with_skip_media(true)
            .with_perceptual(false)
            .with_normalize_text(true);

        assert!(config.dry_run);
        assert!(config.text_dedup);
        assert!(config.scope_by_author);
        assert!(config.skip_media);
        assert!(!config.perceptual);
        assert!(config.normalize_text);
    }

    #[test_case("1", Some(true))]
    #[test_case("TRUE", Some(true))]
    #[test_case(" on ", Some(true))]
    #[test_case("0", Some(false))]
    #[test_case("No", Some(false))]
    #[test_case("maybe", None)]
    #[test_case("", None)]
    fn test_parse_bool(input: &str, expected: Option<bool>) {
        assert_eq!(parse_bool(input), expected);
    }
}
