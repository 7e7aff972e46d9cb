//! # chatdedup
//!
//! Finds duplicate media (and optionally text) in the message history of a
//! chat archive, reports every duplicate group, and optionally deletes or
//! exports the duplicates.
//!
//! ## Pipeline
//!
//! ```text
//! MessageSource ──► FingerprintExtractor ──► DuplicateIndex ──► ResolutionPolicy
//!  (oldest first)     (perceptual / sha256)   (media + text)     (report / delete)
//!                                                   │
//!                                                   └──────► ExportSink (files, text log)
//! ```
//!
//! The scan is a single forward pass; resolution runs once the whole stream has
//! been indexed. The earliest-arriving member of every group is the original and
//! is never deleted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatdedup::services::dedup::{DedupConfig, FingerprintExtractor, ResolutionPolicy};
//! use chatdedup::services::scan::scan;
//!
//! let config = DedupConfig::default().with_dry_run(true);
//! let extractor = FingerprintExtractor::new(&config);
//! let mut out = std::io::stdout();
//! let index = scan(&mut source, &extractor, None, &mut out)?;
//! let summary = ResolutionPolicy::new(&config).resolve(&index, &mut source, None, &mut out)?;
//! println!("{} groups", summary.duplicate_groups);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod services;
pub mod source;

pub use config::DedupSettings;
pub use io::ExportSink;
pub use models::{AuthorId, Channel, ChannelKind, Content, MediaDescriptor, Message, MessageId};
pub use services::dedup::{
    DedupConfig, DuplicateIndex, Fingerprint, FingerprintExtractor, FingerprintKind,
    ResolutionPolicy, ResolutionSummary,
};
pub use source::{ChannelResolver, MessageSource};

/// Error type for chatdedup operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty channel name, output path that is not a directory |
/// | `NotFound` | No channel or group with the requested name |
/// | `Source` | Fetch, download or delete fails in the message source |
/// | `Export` | Writing an exported media file or the text log fails |
/// | `OperationFailed` | Config file unreadable, logging cannot be initialized |
///
/// Media that cannot be decoded as an image is not an error; the extractor
/// switches to the content hash instead.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No channel or group matched the requested name.
    #[error("no Channel or Group with name \"{0}\" found")]
    NotFound(String),

    /// The message source failed.
    ///
    /// Raised for every fetch, media download and delete failure. These are
    /// never retried and abort the run.
    #[error("source operation '{operation}' failed: {cause}")]
    Source {
        /// The source operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Writing an export artifact failed.
    #[error("export to '{}' failed: {cause}", path.display())]
    Export {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Source`] from an operation name and any displayable cause.
    pub fn source(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Source {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for chatdedup operations.
pub type Result<T> = std::result::Result<T, Error>;
