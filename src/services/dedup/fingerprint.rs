//! Fingerprint extraction.
//!
//! A [`Fingerprint`] is the grouping key of the duplicate index. Media is
//! fingerprinted with a perceptual hash when the payload decodes as an image,
//! and with a SHA256 content hash otherwise. Text is fingerprinted with a
//! SHA256 of the message text. The three strategies are tagged with a
//! [`FingerprintKind`] that takes part in equality, so keys from different
//! strategies never compare equal even when their digests happen to match.
//!
//! A decodable image and an undecodable copy of the same picture therefore
//! land in different groups. This is a known limitation and is kept as-is.

use std::fmt;

use image::DynamicImage;
use tracing::debug;

use super::config::DedupConfig;
use super::hasher::{ContentHasher, PerceptualHasher};
use super::index::Namespace;
use crate::models::{AuthorId, Content, Message};

/// Scope tag for author-less messages.
const NO_AUTHOR: &[u8] = b"\x00";
/// Scope tag prefixed to a present author id.
const HAS_AUTHOR: &[u8] = b"\x01";

/// Strategy that produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintKind {
    /// 64-bit difference hash of a decoded image.
    Perceptual,
    /// SHA256 of an undecodable media payload.
    Content,
    /// SHA256 of message text.
    Text,
}

impl FingerprintKind {
    /// Returns the index namespace this kind belongs to.
    #[must_use]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::Perceptual | Self::Content => Namespace::Media,
            Self::Text => Namespace::Text,
        }
    }

    /// Returns the kind as a short label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Perceptual => "perceptual",
            Self::Content => "content",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic grouping key.
///
/// Displays as its hex digest, which is also the stem of exported file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    kind: FingerprintKind,
    digest: String,
}

impl Fingerprint {
    /// Creates a fingerprint from a kind and a digest.
    #[must_use]
    pub fn new(kind: FingerprintKind, digest: impl Into<String>) -> Self {
        Self {
            kind,
            digest: digest.into(),
        }
    }

    /// Returns the strategy that produced this fingerprint.
    #[must_use]
    pub const fn kind(&self) -> FingerprintKind {
        self.kind
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns the index namespace of this fingerprint.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.kind.namespace()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}

/// Outcome of trying to decode a media payload as an image.
#[derive(Debug)]
pub enum MediaDecode {
    /// The payload is a decodable image.
    Image(DynamicImage),
    /// The payload is not an image, or is corrupt.
    Opaque,
}

impl MediaDecode {
    /// Attempts to decode `bytes` as an image.
    #[must_use]
    pub fn attempt(bytes: &[u8]) -> Self {
        match image::load_from_memory(bytes) {
            Ok(image) => Self::Image(image),
            Err(e) => {
                debug!(error = %e, len = bytes.len(), "media payload is not a decodable image");
                Self::Opaque
            },
        }
    }
}

/// Derives fingerprints from messages.
///
/// Extraction is a pure function of the payload, the content kind and the
/// scoping settings.
#[derive(Debug, Clone)]
pub struct FingerprintExtractor {
    text_dedup: bool,
    scope_by_author: bool,
    skip_media: bool,
    perceptual: bool,
    normalize_text: bool,
}

impl FingerprintExtractor {
    /// Creates an extractor from the dedup configuration.
    #[must_use]
    pub const fn new(config: &DedupConfig) -> Self {
        Self {
            text_dedup: config.text_dedup,
            scope_by_author: config.scope_by_author,
            skip_media: config.skip_media,
            perceptual: config.perceptual,
            normalize_text: config.normalize_text,
        }
    }

    /// Returns `true` if the media payload of `message` is needed for
    /// extraction.
    #[must_use]
    pub const fn wants_payload(&self, message: &Message) -> bool {
        !self.skip_media && message.media().is_some()
    }

    /// Fingerprints a message.
    ///
    /// `payload` carries the downloaded media bytes; it is ignored for text
    /// messages. Returns `None` for messages that are not fingerprinted:
    /// no content, skipped media, media without a payload, or text while
    /// text dedup is off.
    #[must_use]
    pub fn extract(&self, message: &Message, payload: Option<&[u8]>) -> Option<Fingerprint> {
        let author = message.author.as_ref();
        match &message.content {
            Content::None => None,
            Content::Media(_) if self.skip_media => None,
            Content::Media(_) => payload.map(|bytes| self.fingerprint_media(bytes, author)),
            Content::Text(text) if self.text_dedup => Some(self.fingerprint_text(text, author)),
            Content::Text(_) => None,
        }
    }

    /// Fingerprints a media payload.
    ///
    /// Decodable images get a perceptual hash unless they are flat; flat
    /// images and everything else get a content hash.
    #[must_use]
    pub fn fingerprint_media(&self, bytes: &[u8], author: Option<&AuthorId>) -> Fingerprint {
        let decoded = if self.perceptual {
            MediaDecode::attempt(bytes)
        } else {
            MediaDecode::Opaque
        };

        let perceptual = match decoded {
            MediaDecode::Image(image) => {
                let digest = PerceptualHasher::dhash_hex(&image);
                if digest.is_none() {
                    debug!(len = bytes.len(), "flat image, using content hash");
                }
                digest
            },
            MediaDecode::Opaque => None,
        };

        let (kind, digest) = match perceptual {
            Some(digest) => (FingerprintKind::Perceptual, digest),
            None => {
                if self.perceptual {
                    metrics::counter!("chatdedup_fingerprint_fallback_total").increment(1);
                }
                (FingerprintKind::Content, ContentHasher::hash_bytes(bytes))
            },
        };
        self.scoped(kind, digest, author)
    }

    /// Fingerprints message text.
    #[must_use]
    pub fn fingerprint_text(&self, text: &str, author: Option<&AuthorId>) -> Fingerprint {
        let digest = ContentHasher::hash_text(text, self.normalize_text);
        self.scoped(FingerprintKind::Text, digest, author)
    }

    fn scoped(&self, kind: FingerprintKind, digest: String, author: Option<&AuthorId>) -> Fingerprint {
        if !self.scope_by_author {
            return Fingerprint::new(kind, digest);
        }
        let scoped = match author {
            Some(author) => ContentHasher::hash_parts(&[
                HAS_AUTHOR,
                author.as_str().as_bytes(),
                digest.as_bytes(),
            ]),
            None => ContentHasher::hash_parts(&[NO_AUTHOR, digest.as_bytes()]),
        };
        Fingerprint::new(kind, scoped)
    }
}

impl Default for FingerprintExtractor {
    fn default() -> Self {
        Self::new(&DedupConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaDescriptor, MessageId};
    use chrono::{TimeZone, Utc};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_gradient(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            let v = u8::try_from(x * 255 / (width - 1)).unwrap_or(u8::MAX);
            Rgb([v, v, v])
        });
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png)
            .expect("encode png");
        bytes.into_inner()
    }

    fn png_solid(level: u8) -> Vec<u8> {
        let img = RgbImage::from_pixel(48, 48, Rgb([level, level, level]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png)
            .expect("encode png");
        bytes.into_inner()
    }

    fn media_message(id: i64, author: Option<&str>) -> Message {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let msg = Message::new(
            MessageId::new(id),
            0,
            ts,
            Content::Media(MediaDescriptor::new(format!("photos/{id}.jpg"))),
        );
        match author {
            Some(a) => msg.with_author(a),
            None => msg,
        }
    }

    fn text_message(id: i64, text: &str) -> Message {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Message::new(MessageId::new(id), 0, ts, Content::Text(text.to_string()))
    }

    #[test]
    fn test_decodable_image_uses_perceptual_hash() {
        let extractor = FingerprintExtractor::default();
        let fp = extractor.fingerprint_media(&png_gradient(64, 32), None);

        assert_eq!(fp.kind(), FingerprintKind::Perceptual);
        assert_eq!(fp.digest(), "ffffffffffffffff");
        assert_eq!(fp.namespace(), Namespace::Media);
    }

    #[test]
    fn test_resized_image_matches() {
        let extractor = FingerprintExtractor::default();
        let a = extractor.fingerprint_media(&png_gradient(64, 32), None);
        let b = extractor.fingerprint_media(&png_gradient(128, 64), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_undecodable_bytes_fall_back_to_content_hash() {
        let extractor = FingerprintExtractor::default();
        let fp = extractor.fingerprint_media(b"not an image at all", None);

        assert_eq!(fp.kind(), FingerprintKind::Content);
        assert_eq!(fp.digest(), ContentHasher::hash_bytes(b"not an image at all"));
    }

    #[test]
    fn test_perceptual_disabled_hashes_content() {
        let extractor = FingerprintExtractor::new(&DedupConfig::default().with_perceptual(false));
        let bytes = png_gradient(64, 32);
        let fp = extractor.fingerprint_media(&bytes, None);

        assert_eq!(fp.kind(), FingerprintKind::Content);
        assert_eq!(fp.digest(), ContentHasher::hash_bytes(&bytes));
    }

    #[test]
    fn test_perceptual_and_content_never_equal() {
        let perceptual = Fingerprint::new(FingerprintKind::Perceptual, "abc");
        let content = Fingerprint::new(FingerprintKind::Content, "abc");
        let text = Fingerprint::new(FingerprintKind::Text, "abc");

        assert_ne!(perceptual, content);
        assert_ne!(content, text);
        assert_eq!(perceptual.to_string(), "abc");
    }

    #[test]
    fn test_author_scoping_separates_authors() {
        let extractor =
            FingerprintExtractor::new(&DedupConfig::default().with_scope_by_author(true));
        let bytes = png_gradient(64, 32);

        let alice = extractor.fingerprint_media(&bytes, Some(&AuthorId::from("alice")));
        let bob = extractor.fingerprint_media(&bytes, Some(&AuthorId::from("bob")));
        let alice_again = extractor.fingerprint_media(&bytes, Some(&AuthorId::from("alice")));

        assert_ne!(alice, bob);
        assert_eq!(alice, alice_again);
        assert_eq!(alice.kind(), FingerprintKind::Perceptual);
    }

    #[test]
    fn test_author_scoping_off_ignores_author() {
        let extractor = FingerprintExtractor::default();
        let bytes = png_gradient(64, 32);

        let alice = extractor.fingerprint_media(&bytes, Some(&AuthorId::from("alice")));
        let bob = extractor.fingerprint_media(&bytes, Some(&AuthorId::from("bob")));
        assert_eq!(alice, bob);
    }

    #[test]
    fn test_scoping_groups_authorless_messages_together() {
        let extractor =
            FingerprintExtractor::new(&DedupConfig::default().with_scope_by_author(true));
        let a = extractor.fingerprint_text("hi", None);
        let b = extractor.fingerprint_text("hi", None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_authorless_bucket_never_matches_an_author() {
        let extractor =
            FingerprintExtractor::new(&DedupConfig::default().with_scope_by_author(true));
        let none = extractor.fingerprint_text("hi", None);

        for id in ["none", "", "\u{0}"] {
            assert_ne!(none, extractor.fingerprint_text("hi", Some(&AuthorId::from(id))));
        }
    }

    #[test]
    fn test_flat_images_do_not_group_by_perceptual_hash() {
        let extractor = FingerprintExtractor::default();
        let black = extractor.fingerprint_media(&png_solid(0), None);
        let white = extractor.fingerprint_media(&png_solid(255), None);

        assert_eq!(black.kind(), FingerprintKind::Content);
        assert_eq!(white.kind(), FingerprintKind::Content);
        assert_ne!(black, white);
        assert_eq!(black, extractor.fingerprint_media(&png_solid(0), None));
    }

    #[test]
    fn test_extract_classification() {
        let extractor = FingerprintExtractor::default();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let empty = Message::new(MessageId::new(1), 0, ts, Content::None);

        assert!(extractor.extract(&empty, None).is_none());
        assert!(extractor.extract(&text_message(2, "hello"), None).is_none());
        assert!(extractor.extract(&media_message(3, None), None).is_none());
        assert!(
            extractor
                .extract(&media_message(4, None), Some(b"bytes"))
                .is_some()
        );
    }

    #[test]
    fn test_extract_text_when_enabled() {
        let extractor = FingerprintExtractor::new(&DedupConfig::default().with_text_dedup(true));
        let fp = extractor
            .extract(&text_message(1, "hello"), None)
            .expect("text fingerprint");

        assert_eq!(fp.kind(), FingerprintKind::Text);
        assert_eq!(fp.namespace(), Namespace::Text);
    }

    #[test]
    fn test_skip_media() {
        let extractor = FingerprintExtractor::new(&DedupConfig::default().with_skip_media(true));
        let message = media_message(1, None);

        assert!(!extractor.wants_payload(&message));
        assert!(extractor.extract(&message, Some(b"bytes")).is_none());
    }

    #[test]
    fn test_text_and_media_with_same_bytes_are_isolated() {
        let extractor = FingerprintExtractor::new(
            &DedupConfig::default().with_text_dedup(true).with_perceptual(false),
        );
        let media = extractor.fingerprint_media(b"same", None);
        let text = extractor.fingerprint_text("same", None);

        assert_eq!(media.digest(), text.digest());
        assert_ne!(media, text);
        assert_ne!(media.namespace(), text.namespace());
    }
}
