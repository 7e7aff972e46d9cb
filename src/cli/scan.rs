//! Scan CLI command.

use std::io::Write;

use tracing::info;

use crate::config::DedupSettings;
use crate::io::{ExportSink, prepare_output_dir};
use crate::services::dedup::{
    DedupConfig, FingerprintExtractor, ResolutionPolicy, ResolutionSummary, report,
};
use crate::services::scan::scan;
use crate::source::{ChannelResolver, SessionState};
use crate::{Error, Result};

/// Scan command handler.
///
/// Flags only ever switch features on; a flag left off keeps whatever the
/// config file and environment selected.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScanCommand {
    /// Channel or group name.
    pub channel: String,
    /// Session state handed to the source backend.
    pub session: SessionState,
    /// Output directory, before `~`/`$VAR` expansion.
    pub output: Option<String>,
    /// Report only.
    pub dry_run: bool,
    /// Fingerprint text messages.
    pub text: bool,
    /// Mix the author into every fingerprint.
    pub scope_by_author: bool,
    /// Skip media messages.
    pub skip_media: bool,
}

impl ScanCommand {
    /// Creates a scan command for a channel.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Self::default()
        }
    }

    /// Returns the effective dedup configuration.
    #[must_use]
    pub fn dedup_config(&self, settings: &DedupSettings) -> DedupConfig {
        let base = &settings.dedup;
        base.clone()
            .with_dry_run(base.dry_run || self.dry_run)
            .with_text_dedup(base.text_dedup || self.text)
            .with_scope_by_author(base.scope_by_author || self.scope_by_author)
            .with_skip_media(base.skip_media || self.skip_media)
    }

    /// Runs the scan and resolution passes.
    ///
    /// Input is validated and the output directory prepared before `connect`
    /// is called, so usage errors never touch the source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank channel name or an unusable
    /// output directory, [`Error::NotFound`] if the channel does not exist, and
    /// any source or export error raised during the run.
    pub fn run<R, F, W>(
        &self,
        settings: &DedupSettings,
        connect: F,
        out: &mut W,
    ) -> Result<ResolutionSummary>
    where
        R: ChannelResolver,
        F: FnOnce(&SessionState) -> Result<R>,
        W: Write + ?Sized,
    {
        let name = self.channel.as_str();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("channel name cannot be empty".to_string()));
        }

        let config = self.dedup_config(settings);
        let mut export = match &self.output {
            Some(raw) => Some(
                ExportSink::new(prepare_output_dir(raw)?)
                    .with_extension(settings.export.extension.clone())
                    .with_text_log_name(settings.export.text_log_name.clone()),
            ),
            None => None,
        };

        let resolver = connect(&self.session)?;
        let channel = resolver
            .resolve(name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        report(out, format_args!("Found {channel}.."))?;

        let mut source = resolver.open(&channel)?;
        let extractor = FingerprintExtractor::new(&config);
        let index = scan(&mut source, &extractor, export.as_mut(), out)?;

        let summary =
            ResolutionPolicy::new(&config).resolve(&index, &mut source, export.as_mut(), out)?;
        info!(channel = %channel.name, groups = summary.duplicate_groups, "scan finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_only_enable() {
        let mut settings = DedupSettings::default();
        settings.dedup.text_dedup = true;

        let cmd = ScanCommand {
            dry_run: true,
            ..ScanCommand::new("memes")
        };
        let config = cmd.dedup_config(&settings);

        assert!(config.dry_run);
        assert!(config.text_dedup);
        assert!(!config.scope_by_author);
        assert!(!config.skip_media);
    }

    #[test]
    fn test_blank_channel_is_usage_error() {
        let cmd = ScanCommand::new("  ");
        let err = cmd
            .run(
                &DedupSettings::default(),
                |_| -> Result<crate::source::ArchiveResolver> {
                    Err(Error::source("connect", "must not be called"))
                },
                &mut Vec::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
