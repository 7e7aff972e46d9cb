//! Download CLI command.

use std::io::Write;

use crate::config::DedupSettings;
use crate::io::{ExportSink, ExtensionPolicy, prepare_output_dir};
use crate::services::dedup::{FingerprintExtractor, report};
use crate::services::scan::{DownloadSummary, download_all};
use crate::source::{ChannelResolver, SessionState};
use crate::{Error, Result};

/// Download command handler.
///
/// Writes every distinct media item of a channel to a directory. Extensions
/// are always derived from the MIME type.
#[derive(Debug, Clone, Default)]
pub struct DownloadCommand {
    /// Channel or group name.
    pub channel: String,
    /// Output directory, before `~`/`$VAR` expansion.
    pub output: String,
    /// Session state handed to the source backend.
    pub session: SessionState,
}

impl DownloadCommand {
    /// Creates a download command.
    #[must_use]
    pub fn new(channel: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            output: output.into(),
            session: SessionState::default(),
        }
    }

    /// Runs the download pass.
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
    ) -> Result<DownloadSummary>
    where
        R: ChannelResolver,
        F: FnOnce(&SessionState) -> Result<R>,
        W: Write + ?Sized,
    {
        let name = self.channel.as_str();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("channel name cannot be empty".to_string()));
        }
        let sink = ExportSink::new(prepare_output_dir(&self.output)?)
            .with_extension(ExtensionPolicy::MimeDerived);

        let resolver = connect(&self.session)?;
        let channel = resolver
            .resolve(name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        report(out, format_args!("Found {channel}.."))?;

        let mut source = resolver.open(&channel)?;
        let extractor = FingerprintExtractor::new(&settings.dedup);
        download_all(&mut source, &extractor, &sink, out)
    }
}
