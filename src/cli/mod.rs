//! CLI command implementations.
//!
//! Argument parsing lives in the binary; these handlers take parsed options,
//! the loaded settings and a way to connect to a source, and write report
//! lines to any [`std::io::Write`].
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Find duplicates, report them, and optionally delete or export them |
//! | `download` | Write every distinct media item of a channel to a directory |
//!
//! # Example Usage
//!
//! ```bash
//! # Report duplicates without deleting anything
//! chatdedup scan --archive ~/Downloads/export --dry "Cat Pictures"
//!
//! # Delete duplicates, also checking text, and keep copies of what was found
//! chatdedup scan --archive ~/Downloads/export --text -o dups "Cat Pictures"
//!
//! # Download every distinct item
//! chatdedup download --archive ~/Downloads/export "Cat Pictures" ./all
//! ```

mod download;
mod scan;

pub use download::DownloadCommand;
pub use scan::ScanCommand;
