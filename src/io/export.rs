//! Duplicate export sink.
//!
//! Writes duplicate media payloads into an output directory and collects the
//! text-duplicate log. Media files are written immediately and any failure is
//! fatal. The text log is buffered for the whole run and written once by
//! [`ExportSink::flush_text_log`].

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::models::{MediaDescriptor, Message};
use crate::services::dedup::Fingerprint;
use crate::{Error, Result};

/// Default extension for exported media.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Default file name of the text-duplicate log.
pub const DEFAULT_TEXT_LOG_NAME: &str = "text-duplicates.log";

/// How exported media files get their extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// Always use the given extension.
    Fixed(String),
    /// `mp4` for video MIME types, `jpg` for everything else.
    MimeDerived,
}

impl ExtensionPolicy {
    /// Returns the extension for a media attachment.
    #[must_use]
    pub fn extension_for(&self, media: &MediaDescriptor) -> &str {
        match self {
            Self::Fixed(ext) => ext,
            Self::MimeDerived if media.is_video() => "mp4",
            Self::MimeDerived => DEFAULT_EXTENSION,
        }
    }
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_EXTENSION.to_string())
    }
}

/// Expands `~` and `$VAR` in `raw` and makes sure it names a usable output
/// directory, creating it with all parents if it does not exist.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the path exists and is not a directory
/// or cannot be expanded, and [`Error::Export`] if it cannot be created.
pub fn prepare_output_dir(raw: &str) -> Result<PathBuf> {
    let dir = crate::config::expand_path(raw)?;
    if dir.exists() && !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "output \"{}\" is not a directory",
            dir.display()
        )));
    }
    fs::create_dir_all(&dir).map_err(|e| Error::Export {
        path: dir.clone(),
        cause: e.to_string(),
    })?;
    Ok(dir)
}

/// Output directory plus the in-memory text-duplicate log.
#[derive(Debug)]
pub struct ExportSink {
    dir: PathBuf,
    extension: ExtensionPolicy,
    text_log_name: String,
    text_log: String,
    text_groups: usize,
}

impl ExportSink {
    /// Creates a sink writing into `dir`, which must already exist.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: ExtensionPolicy::default(),
            text_log_name: DEFAULT_TEXT_LOG_NAME.to_string(),
            text_log: String::new(),
            text_groups: 0,
        }
    }

    /// Sets the extension policy.
    #[must_use]
    pub fn with_extension(mut self, extension: ExtensionPolicy) -> Self {
        self.extension = extension;
        self
    }

    /// Sets the file name of the text-duplicate log.
    #[must_use]
    pub fn with_text_log_name(mut self, name: impl Into<String>) -> Self {
        self.text_log_name = name.into();
        self
    }

    /// Returns the output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path the text log will be written to.
    #[must_use]
    pub fn text_log_path(&self) -> PathBuf {
        self.dir.join(&self.text_log_name)
    }

    /// Writes a duplicate group member as `<fingerprint>-<index>.<ext>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] if the file cannot be written.
    pub fn write_member(
        &self,
        fingerprint: &Fingerprint,
        index: usize,
        media: &MediaDescriptor,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let name = format!(
            "{fingerprint}-{index}.{}",
            self.extension.extension_for(media)
        );
        self.write_file(&name, bytes)
    }

    /// Writes a first-seen item as `<seq>-<fingerprint>.<ext>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] if the file cannot be written.
    pub fn write_sequenced(
        &self,
        seq: u64,
        fingerprint: &Fingerprint,
        media: &MediaDescriptor,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let name = format!("{seq}-{fingerprint}.{}", self.extension.extension_for(media));
        self.write_file(&name, bytes)
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|e| Error::Export {
            path: path.clone(),
            cause: e.to_string(),
        })?;
        debug!(path = %path.display(), len = bytes.len(), "exported media");
        Ok(path)
    }

    /// Appends a text duplicate group to the log buffer.
    ///
    /// Empty groups are ignored.
    pub fn record_text_group(&mut self, fingerprint: &Fingerprint, members: &[Message]) {
        let Some(original) = members.first() else {
            return;
        };
        if self.text_groups > 0 {
            self.text_log.push('\n');
        }
        // Writing into a String never fails.
        let _ = writeln!(self.text_log, "Duplicates of {fingerprint}: {}", members.len());
        let _ = writeln!(self.text_log, "Text: {}", original.text().unwrap_or_default());
        for (i, member) in members.iter().enumerate() {
            let _ = write!(
                self.text_log,
                "  {}. Message {} at {}",
                i + 1,
                member.id,
                member.timestamp.to_rfc3339()
            );
            self.text_log
                .push_str(if i == 0 { " (Original)\n" } else { "\n" });
        }
        self.text_groups += 1;
    }

    /// Returns the number of text groups recorded so far.
    #[must_use]
    pub const fn text_groups(&self) -> usize {
        self.text_groups
    }

    /// Writes the text log, if any group was recorded.
    ///
    /// The buffer is consumed; a second call writes nothing. Returns the path
    /// written, or `None` when there was nothing to write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] if the log cannot be written.
    #[instrument(skip(self), fields(groups = self.text_groups))]
    pub fn flush_text_log(&mut self) -> Result<Option<PathBuf>> {
        if self.text_log.is_empty() {
            return Ok(None);
        }
        let contents = std::mem::take(&mut self.text_log);
        let path = self.text_log_path();
        fs::write(&path, contents).map_err(|e| Error::Export {
            path: path.clone(),
            cause: e.to_string(),
        })?;
        Ok(Some(path))
    }
}
