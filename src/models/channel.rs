//! Channel and group handles.

use std::fmt;

/// Whether a handle refers to a broadcast channel or a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Broadcast channel.
    Channel,
    /// Group chat.
    Group,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => write!(f, "Channel"),
            Self::Group => write!(f, "Group"),
        }
    }
}

/// A resolved channel or group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Source-assigned identifier.
    pub id: i64,
    /// Human-readable name.
    pub name: String,
    /// Channel or group.
    pub kind: ChannelKind,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" with ID {}", self.kind, self.name, self.id)
    }
}
