//! Streaming passes over a message source.
//!
//! [`scan`] walks the stream once, fingerprints every message and builds the
//! [`DuplicateIndex`]. [`download_all`] walks the stream once and writes every
//! distinct media item to disk without deleting anything.

use std::collections::HashSet;
use std::io::Write;

use tracing::{debug, info, instrument};

use crate::Result;
use crate::io::ExportSink;
use crate::services::dedup::{DuplicateIndex, Fingerprint, FingerprintExtractor, report};
use crate::source::MessageSource;

/// Progress is reported every this many distinct downloads.
const PROGRESS_EVERY: u64 = 10;

/// Scans the whole stream and returns the populated index.
///
/// Every message is stamped with its arrival position. Media payloads are
/// downloaded only when the extractor needs them and dropped once
/// fingerprinted. Each duplicate is reported as it is found.
///
/// With an export sink, a media group reaching two members writes the
/// original as `<fp>-0` and the duplicate as `<fp>-1`; later duplicates are
/// written as `<fp>-<index>`.
///
/// # Errors
///
/// Returns an error if the source fails, an export file cannot be written, or
/// the report cannot be written. Nothing is retried.
#[instrument(skip_all)]
pub fn scan<S, W>(
    source: &mut S,
    extractor: &FingerprintExtractor,
    mut export: Option<&mut ExportSink>,
    out: &mut W,
) -> Result<DuplicateIndex>
where
    S: MessageSource + ?Sized,
    W: Write + ?Sized,
{
    let mut index = DuplicateIndex::new();
    let mut position = 0u64;

    while let Some(mut message) = source.next_message()? {
        message.position = position;
        position += 1;
        metrics::counter!("chatdedup_messages_scanned_total").increment(1);

        let payload = match message.media() {
            Some(media) if extractor.wants_payload(&message) => Some(source.download(media)?),
            _ => None,
        };
        let Some(fingerprint) = extractor.extract(&message, payload.as_deref()) else {
            continue;
        };

        let id = message.id;
        let media = message.media().cloned();
        let size = index.append(fingerprint.clone(), message);
        if size < 2 {
            continue;
        }

        report(
            out,
            format_args!("Duplicate of {fingerprint} detected in Message {id}.."),
        )?;

        if let (Some(sink), Some(media), Some(bytes)) = (export.as_deref_mut(), media, payload) {
            if size == 2 {
                export_original(source, sink, &index, &fingerprint)?;
            }
            sink.write_member(&fingerprint, size - 1, &media, &bytes)?;
        }
    }

    info!(scanned = position, "scan complete");
    Ok(index)
}

/// Downloads the original of a group again and writes it as `<fp>-0`.
fn export_original<S: MessageSource + ?Sized>(
    source: &mut S,
    sink: &ExportSink,
    index: &DuplicateIndex,
    fingerprint: &Fingerprint,
) -> Result<()> {
    let original = index
        .group(fingerprint)
        .and_then(<[_]>::first)
        .and_then(|m| m.media());
    if let Some(media) = original {
        let bytes = source.download(media)?;
        sink.write_member(fingerprint, 0, media, &bytes)?;
    }
    Ok(())
}

/// Counts from a bulk download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Distinct items written.
    pub distinct: u64,
    /// Duplicates skipped.
    pub duplicates: u64,
}

/// Writes every distinct media item as `<seq>-<fp>.<ext>`.
///
/// Duplicates of an item already written are reported and skipped. A progress
/// line is printed before every tenth distinct item. Nothing is deleted.
///
/// # Errors
///
/// Returns an error if the source fails, a file cannot be written, or the
/// report cannot be written.
#[instrument(skip_all, fields(dir = %sink.dir().display()))]
pub fn download_all<S, W>(
    source: &mut S,
    extractor: &FingerprintExtractor,
    sink: &ExportSink,
    out: &mut W,
) -> Result<DownloadSummary>
where
    S: MessageSource + ?Sized,
    W: Write + ?Sized,
{
    let mut seen: HashSet<Fingerprint> = HashSet::new();
    let mut summary = DownloadSummary::default();

    while let Some(message) = source.next_message()? {
        metrics::counter!("chatdedup_messages_scanned_total").increment(1);
        let Some(media) = message.media() else {
            continue;
        };

        let bytes = source.download(media)?;
        let fingerprint = extractor.fingerprint_media(&bytes, message.author.as_ref());

        if seen.contains(&fingerprint) {
            report(
                out,
                format_args!(
                    "Duplicate of {fingerprint} detected in Message {}..",
                    message.id
                ),
            )?;
            summary.duplicates += 1;
            continue;
        }

        if summary.distinct % PROGRESS_EVERY == 0 {
            report(out, format_args!("Downloading item {}..", summary.distinct))?;
        }
        let path = sink.write_sequenced(summary.distinct, &fingerprint, media, &bytes)?;
        debug!(path = %path.display(), message = %message.id, "downloaded");
        seen.insert(fingerprint);
        summary.distinct += 1;
    }

    report(
        out,
        format_args!(
            "Downloaded {} distinct items, skipped {} duplicates",
            summary.distinct, summary.duplicates
        ),
    )?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Content, MediaDescriptor, Message, MessageId};
    use crate::services::dedup::DedupConfig;
    use crate::{Error, Result};
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};
    use tempfile::TempDir;

    struct StubSource {
        messages: VecDeque<Message>,
        blobs: HashMap<String, Vec<u8>>,
        downloads: usize,
    }

    impl StubSource {
        fn new(items: &[(i64, Option<&str>, &str)]) -> Self {
            let mut messages = VecDeque::new();
            let mut blobs = HashMap::new();
            for (id, mime, bytes) in items {
                let mut media = MediaDescriptor::new(format!("m{id}"));
                if let Some(mime) = mime {
                    media = media.with_mime_type(*mime);
                }
                blobs.insert(media.handle.clone(), bytes.as_bytes().to_vec());
                messages.push_back(Message::new(
                    MessageId::new(*id),
                    999,
                    Utc::now(),
                    Content::Media(media),
                ));
            }
            Self {
                messages,
                blobs,
                downloads: 0,
            }
        }
    }

    impl MessageSource for StubSource {
        fn next_message(&mut self) -> Result<Option<Message>> {
            Ok(self.messages.pop_front())
        }

        fn download(&mut self, media: &MediaDescriptor) -> Result<Vec<u8>> {
            self.downloads += 1;
            self.blobs
                .get(&media.handle)
                .cloned()
                .ok_or_else(|| Error::source("download", "missing"))
        }

        fn delete(&mut self, _message: &Message) -> Result<()> {
            Err(Error::source("delete", "not supported"))
        }
    }

    fn extractor() -> FingerprintExtractor {
        FingerprintExtractor::new(&DedupConfig::default())
    }

    #[test]
    fn test_scan_stamps_positions_and_reports() {
        let mut source = StubSource::new(&[(1, None, "aa"), (2, None, "b"), (3, None, "aa")]);
        let mut out = Vec::new();

        let index = scan(&mut source, &extractor(), None, &mut out).unwrap();
        let fp = extractor().fingerprint_media(b"aa", None);
        let group = index.group(&fp).unwrap();

        assert_eq!(group.iter().map(|m| m.position).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Duplicate of {fp} detected in Message 3..\n")
        );
    }

    #[test]
    fn test_scan_skips_download_when_media_skipped() {
        let mut source = StubSource::new(&[(1, None, "aa"), (2, None, "aa")]);
        let extractor = FingerprintExtractor::new(&DedupConfig::default().with_skip_media(true));

        let index = scan(&mut source, &extractor, None, &mut Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(source.downloads, 0);
    }

    #[test]
    fn test_scan_exports_original_once() {
        let dir = TempDir::new().unwrap();
        let mut sink = ExportSink::new(dir.path());
        let mut source = StubSource::new(&[(1, None, "x"), (2, None, "x"), (3, None, "x")]);

        scan(&mut source, &extractor(), Some(&mut sink), &mut Vec::new()).unwrap();

        let fp = extractor().fingerprint_media(b"x", None);
        for i in 0..3 {
            assert!(dir.path().join(format!("{fp}-{i}.jpg")).is_file());
        }
        // 3 scan downloads plus one re-download of the original
        assert_eq!(source.downloads, 4);
    }

    #[test]
    fn test_scan_propagates_download_failure() {
        let mut source = StubSource::new(&[(1, None, "x")]);
        source.blobs.clear();

        let err = scan(&mut source, &extractor(), None, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Source { .. }));
    }

    #[test]
    fn test_download_all_writes_first_seen_only() {
        let dir = TempDir::new().unwrap();
        let sink = ExportSink::new(dir.path()).with_extension(crate::io::ExtensionPolicy::MimeDerived);
        let mut source = StubSource::new(&[
            (1, Some("image/jpeg"), "one"),
            (2, Some("video/mp4"), "two"),
            (3, Some("image/jpeg"), "one"),
        ]);
        let mut out = Vec::new();

        let summary = download_all(&mut source, &extractor(), &sink, &mut out).unwrap();

        assert_eq!(summary, DownloadSummary { distinct: 2, duplicates: 1 });
        let one = extractor().fingerprint_media(b"one", None);
        let two = extractor().fingerprint_media(b"two", None);
        assert!(dir.path().join(format!("0-{one}.jpg")).is_file());
        assert!(dir.path().join(format!("1-{two}.mp4")).is_file());

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Downloading item 0..\n"));
        assert!(out.contains(&format!("Duplicate of {one} detected in Message 3..")));
        assert!(out.ends_with("Downloaded 2 distinct items, skipped 1 duplicates\n"));
    }
}
