//! Message sources.
//!
//! The dedup engine never talks to a chat service directly. It pulls messages
//! through [`MessageSource`] and finds the channel to scan through
//! [`ChannelResolver`]. Both calls are blocking and are made one at a time.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`ArchiveResolver`] / [`ArchiveSource`] | Exported chat archive (`result.json` + media files) |

mod archive;
mod session;

pub use archive::{ArchiveResolver, ArchiveSource};
pub use session::{DEFAULT_STATE_FILE, SessionState};

use crate::Result;
use crate::models::{Channel, MediaDescriptor, Message};

/// Forward-only, oldest-first stream of messages from one channel or group.
///
/// A source is consumed once per run. It is neither restartable nor
/// resumable; every failure is returned as [`crate::Error::Source`] and is
/// not retried.
pub trait MessageSource {
    /// Returns the next message, oldest first, or `None` once the history is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be fetched.
    fn next_message(&mut self) -> Result<Option<Message>>;

    /// Downloads the payload of a media attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be fetched.
    fn download(&mut self, media: &MediaDescriptor) -> Result<Vec<u8>>;

    /// Deletes a message from the channel.
    ///
    /// # Errors
    ///
    /// Returns an error on permission failures, rate limiting, or I/O errors.
    fn delete(&mut self, message: &Message) -> Result<()>;
}

/// Looks up channels and groups by name and opens their message streams.
pub trait ChannelResolver {
    /// The source type produced for a resolved channel.
    type Source: MessageSource;

    /// Finds a channel or group by its exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel list cannot be fetched.
    fn resolve(&self, name: &str) -> Result<Option<Channel>>;

    /// Opens the message stream for a resolved channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    fn open(&self, channel: &Channel) -> Result<Self::Source>;
}
