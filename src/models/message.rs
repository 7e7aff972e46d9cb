//! Message types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a message within its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Creates a new message ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric ID.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a message author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    /// Creates a new author ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AuthorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference to a binary attachment held by the message source.
///
/// The bytes are not part of the descriptor; they are fetched on demand with
/// [`crate::MessageSource::download`] and dropped once fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Source-specific handle used to download the payload.
    pub handle: String,
    /// MIME type reported by the source, if any.
    pub mime_type: Option<String>,
}

impl MediaDescriptor {
    /// Creates a descriptor without a MIME type.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            mime_type: None,
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns true when the source reports a video MIME type.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("video/"))
    }
}

/// Content classification of a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Content {
    /// Nothing to fingerprint (service messages, empty posts).
    #[default]
    None,
    /// A binary attachment (photo, video, document).
    Media(MediaDescriptor),
    /// Plain text.
    Text(String),
}

/// A message yielded by a [`crate::MessageSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message identity.
    pub id: MessageId,
    /// Arrival position in the scan; strictly increasing, chronological.
    pub position: u64,
    /// When the message was posted.
    pub timestamp: DateTime<Utc>,
    /// Who posted it, when the source knows.
    pub author: Option<AuthorId>,
    /// What the message carries.
    pub content: Content,
}

impl Message {
    /// Creates a message without an author.
    #[must_use]
    pub const fn new(
        id: MessageId,
        position: u64,
        timestamp: DateTime<Utc>,
        content: Content,
    ) -> Self {
        Self {
            id,
            position,
            timestamp,
            author: None,
            content,
        }
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<AuthorId>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Returns the media descriptor, if this is a media message.
    #[must_use]
    pub const fn media(&self) -> Option<&MediaDescriptor> {
        match &self.content {
            Content::Media(media) => Some(media),
            _ => None,
        }
    }

    /// Returns the text, if this is a text message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }
}
