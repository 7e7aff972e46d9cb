//! Duplicate detection and resolution.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          scan pass                                │
//! │  ┌──────────────────────┐      ┌───────────────────────────────┐  │
//! │  │ FingerprintExtractor │ ───► │ DuplicateIndex                │  │
//! │  │                      │      │                               │  │
//! │  │ dHash / SHA256 media │      │ media: fp -> [msg, msg, ...]  │  │
//! │  │ SHA256 text          │      │ text:  fp -> [msg, msg, ...]  │  │
//! │  └──────────────────────┘      └───────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ ResolutionPolicy: report every group, delete members 1..N-1       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use chatdedup::services::dedup::{
//!     DedupConfig, DuplicateIndex, FingerprintExtractor, FingerprintKind,
//! };
//! use chatdedup::{Content, Message, MessageId};
//!
//! let at = |id: i64| Message::new(MessageId::new(id), 0, chrono::Utc::now(), Content::None);
//! let extractor = FingerprintExtractor::new(&DedupConfig::default());
//! let mut index = DuplicateIndex::new();
//!
//! let fp = extractor.fingerprint_media(b"not an image", None);
//! assert_eq!(fp.kind(), FingerprintKind::Content);
//! assert_eq!(index.append(fp.clone(), at(1)), 1);
//! assert_eq!(index.append(fp, at(2)), 2);
//! ```

mod config;
mod fingerprint;
mod hasher;
mod index;
mod resolution;

pub use config::DedupConfig;
pub use fingerprint::{Fingerprint, FingerprintExtractor, FingerprintKind, MediaDecode};
pub use hasher::{ContentHasher, PerceptualHasher};
pub use index::{DuplicateIndex, Namespace};
pub use resolution::{ResolutionPolicy, ResolutionSummary};
pub(crate) use resolution::report;
