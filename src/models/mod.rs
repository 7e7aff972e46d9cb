//! Data models for chatdedup.
//!
//! All models are transient: they are built during one scan and dropped at
//! process exit.

mod channel;
mod message;

pub use channel::{Channel, ChannelKind};
pub use message::{AuthorId, Content, MediaDescriptor, Message, MessageId};
