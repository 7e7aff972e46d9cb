//! Resolution pass.
//!
//! Runs once the scan has indexed the whole stream. For every group with at
//! least two members, member 0 is the original and stays untouched; every
//! later member is reported and, unless dry-run is set, deleted through the
//! message source.

use std::io::Write;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use super::config::DedupConfig;
use super::index::{DuplicateIndex, Namespace};
use crate::io::ExportSink;
use crate::models::Message;
use crate::source::MessageSource;
use crate::{Error, Result};

/// Outcome of a resolution pass.
#[derive(Debug, Default)]
pub struct ResolutionSummary {
    /// Groups with at least two members, across both namespaces.
    pub duplicate_groups: usize,
    /// Members after the original, across all groups.
    pub duplicates: usize,
    /// Delete requests issued.
    pub deletes: usize,
    /// Path of the text log, if one was written.
    pub text_log: Option<PathBuf>,
    /// Text log write failure. The run still succeeded.
    pub text_log_error: Option<Error>,
}

/// Decides what happens to each duplicate group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionPolicy {
    dry_run: bool,
}

impl ResolutionPolicy {
    /// Creates a policy from the dedup configuration.
    #[must_use]
    pub const fn new(config: &DedupConfig) -> Self {
        Self {
            dry_run: config.dry_run,
        }
    }

    /// Creates a policy with an explicit dry-run setting.
    #[must_use]
    pub const fn with_dry_run(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Reports every duplicate group to `out`, deletes duplicates unless
    /// dry-run is set, and records text groups into `export`.
    ///
    /// Media groups are resolved before text groups; within a namespace,
    /// groups are visited in the order their fingerprint was first seen.
    ///
    /// # Errors
    ///
    /// Returns an error if a delete fails or the report cannot be written.
    /// Deletes already issued stay in effect. A failure to write the text log
    /// is not an error; it is returned in [`ResolutionSummary::text_log_error`].
    #[instrument(skip_all, fields(dry_run = self.dry_run))]
    pub fn resolve<S, W>(
        &self,
        index: &DuplicateIndex,
        source: &mut S,
        mut export: Option<&mut ExportSink>,
        out: &mut W,
    ) -> Result<ResolutionSummary>
    where
        S: MessageSource + ?Sized,
        W: Write + ?Sized,
    {
        let mut summary = ResolutionSummary::default();

        if self.dry_run {
            report(out, format_args!("Dry run, not deleting anything.."))?;
        }

        for namespace in Namespace::ALL {
            for (fingerprint, members) in index.duplicates(namespace) {
                let Some((original, duplicates)) = members.split_first() else {
                    continue;
                };

                report(
                    out,
                    format_args!("Duplicates of {fingerprint}: {}", members.len()),
                )?;
                report(
                    out,
                    format_args!("\tMessage {} (Original)", describe(original)),
                )?;

                for duplicate in duplicates {
                    report(out, format_args!("\tMessage {}", describe(duplicate)))?;
                    if !self.dry_run {
                        source.delete(duplicate)?;
                        summary.deletes += 1;
                        metrics::counter!("chatdedup_deletes_total").increment(1);
                    }
                }

                summary.duplicate_groups += 1;
                summary.duplicates += duplicates.len();
                metrics::counter!(
                    "chatdedup_duplicate_groups_total",
                    "namespace" => namespace.as_str()
                )
                .increment(1);

                if namespace == Namespace::Text {
                    if let Some(sink) = export.as_deref_mut() {
                        sink.record_text_group(fingerprint, members);
                    }
                }
            }
        }

        report(
            out,
            format_args!("{} Duplicate entries found!", summary.duplicate_groups),
        )?;

        if let Some(sink) = export {
            match sink.flush_text_log() {
                Ok(path) => summary.text_log = path,
                Err(e) => {
                    warn!(error = %e, "failed to write text duplicate log");
                    summary.text_log_error = Some(e);
                },
            }
        }

        info!(
            groups = summary.duplicate_groups,
            duplicates = summary.duplicates,
            deletes = summary.deletes,
            "resolution complete"
        );
        Ok(summary)
    }
}

fn describe(message: &Message) -> String {
    format!("{} ({})", message.id, message.timestamp.to_rfc3339())
}

/// Writes one report line.
pub(crate) fn report<W: Write + ?Sized>(out: &mut W, line: std::fmt::Arguments<'_>) -> Result<()> {
    writeln!(out, "{line}").map_err(|e| Error::OperationFailed {
        operation: "write_report".to_string(),
        cause: e.to_string(),
    })
}
