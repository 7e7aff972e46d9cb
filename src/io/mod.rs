//! Filesystem output.
//!
//! | Artifact | Name | Written |
//! |----------|------|---------|
//! | Duplicate group member | `<fingerprint>-<index>.<ext>` | During the scan |
//! | Bulk download item | `<seq>-<fingerprint>.<ext>` | During the download pass |
//! | Text-duplicate log | `text-duplicates.log` | Once, after resolution |

mod export;

pub use export::{
    DEFAULT_EXTENSION, DEFAULT_TEXT_LOG_NAME, ExportSink, ExtensionPolicy, prepare_output_dir,
};
