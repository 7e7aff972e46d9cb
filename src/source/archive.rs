//! Exported chat archive backend.
//!
//! Reads a chat export directory laid out like a Telegram Desktop JSON export:
//!
//! ```text
//! <archive>/
//!   result.json          single chat object, or { "chats": { "list": [...] } }
//!   photos/photo_1.jpg   referenced by a message's "photo" field
//!   files/clip.mp4       referenced by "file", with "mime_type"
//! ```
//!
//! Deleting a message rewrites `result.json` without it and removes its media
//! file once no remaining message refers to that file. Exports reuse one file
//! for repeated uploads of the same media. Each delete is persisted before the
//! call returns.

use crate::models::{AuthorId, Channel, ChannelKind, Content, MediaDescriptor, Message, MessageId};
use crate::source::{ChannelResolver, MessageSource, SessionState};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

const RESULT_FILE: &str = "result.json";
const FILE_NOT_INCLUDED: &str = "(File not included";
const PHOTO_MIME: &str = "image/jpeg";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Where a chat object lives inside `result.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatLocation {
    /// Single-chat export: the document is the chat.
    Root,
    /// Full export: index into `chats.list`.
    Listed(usize),
}

/// Resolves channel and group names against an exported archive.
pub struct ArchiveResolver {
    root: PathBuf,
    document: Value,
}

impl ArchiveResolver {
    /// Opens the archive rooted at `root`.
    ///
    /// The session state is accepted for parity with networked backends; an
    /// exported archive needs no authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if `result.json` cannot be read or parsed.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>, session: &SessionState) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let document = read_document(&root.join(RESULT_FILE))?;
        match session.path() {
            Some(path) => debug!(session = %path.display(), "Archive backend ignores session state"),
            None => debug!("Session persistence disabled"),
        }
        Ok(Self { root, document })
    }

    fn chats(&self) -> Vec<(ChatLocation, &Value)> {
        if let Some(list) = self
            .document
            .get("chats")
            .and_then(|chats| chats.get("list"))
            .and_then(Value::as_array)
        {
            return list
                .iter()
                .enumerate()
                .map(|(i, chat)| (ChatLocation::Listed(i), chat))
                .collect();
        }
        vec![(ChatLocation::Root, &self.document)]
    }

    /// Counts the messages referring to each media file, across all chats.
    fn media_refs(&self) -> HashMap<String, usize> {
        let mut refs = HashMap::new();
        for (_, chat) in self.chats() {
            let Some(messages) = chat.get("messages").and_then(Value::as_array) else {
                continue;
            };
            for handle in messages.iter().filter_map(media_handle) {
                *refs.entry(handle.to_string()).or_insert(0) += 1;
            }
        }
        refs
    }
}

impl ChannelResolver for ArchiveResolver {
    type Source = ArchiveSource;

    fn resolve(&self, name: &str) -> Result<Option<Channel>> {
        for (_, chat) in self.chats() {
            if chat.get("name").and_then(Value::as_str) != Some(name) {
                continue;
            }
            let Some(kind) = chat.get("type").and_then(Value::as_str).and_then(chat_kind) else {
                continue;
            };
            return Ok(Some(Channel {
                id: chat.get("id").and_then(Value::as_i64).unwrap_or_default(),
                name: name.to_string(),
                kind,
            }));
        }
        Ok(None)
    }

    #[instrument(skip(self), fields(channel_id = channel.id))]
    fn open(&self, channel: &Channel) -> Result<ArchiveSource> {
        let (location, chat) = self
            .chats()
            .into_iter()
            .find(|(_, chat)| {
                chat.get("id").and_then(Value::as_i64).unwrap_or_default() == channel.id
                    && chat.get("name").and_then(Value::as_str) == Some(channel.name.as_str())
            })
            .ok_or_else(|| Error::NotFound(channel.name.clone()))?;

        let raw: Vec<RawMessage> = match chat.get("messages") {
            Some(messages) => serde_json::from_value(messages.clone())
                .map_err(|e| Error::source("fetch", e))?,
            None => Vec::new(),
        };

        let mut messages = raw
            .into_iter()
            .map(RawMessage::into_message)
            .collect::<Result<Vec<_>>>()?;
        // Message ids grow with time within a chat.
        messages.sort_by_key(|message| message.id);
        debug!(count = messages.len(), "Loaded archive messages");

        Ok(ArchiveSource {
            root: self.root.clone(),
            document: self.document.clone(),
            location,
            pending: messages.into(),
            media_refs: self.media_refs(),
        })
    }
}

/// Oldest-first message stream over one chat of an exported archive.
pub struct ArchiveSource {
    root: PathBuf,
    document: Value,
    location: ChatLocation,
    pending: VecDeque<Message>,
    media_refs: HashMap<String, usize>,
}

impl ArchiveSource {
    fn chat_mut(&mut self) -> Option<&mut Value> {
        match self.location {
            ChatLocation::Root => Some(&mut self.document),
            ChatLocation::Listed(i) => self
                .document
                .get_mut("chats")
                .and_then(|chats| chats.get_mut("list"))
                .and_then(|list| list.get_mut(i)),
        }
    }

    fn remove_from_document(&mut self, id: MessageId) -> Result<()> {
        let messages = self
            .chat_mut()
            .and_then(|chat| chat.get_mut("messages"))
            .and_then(Value::as_array_mut)
            .ok_or_else(|| Error::source("delete", "chat has no message list"))?;

        let before = messages.len();
        messages.retain(|m| m.get("id").and_then(Value::as_i64) != Some(id.get()));
        if messages.len() == before {
            return Err(Error::source("delete", format!("message {id} not found")));
        }
        Ok(())
    }

    /// Drops one reference to `handle`; returns `true` if it was the last.
    fn release(&mut self, handle: &str) -> bool {
        match self.media_refs.get_mut(handle) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            },
            _ => {
                self.media_refs.remove(handle);
                true
            },
        }
    }

    fn persist(&self) -> Result<()> {
        let path = self.root.join(RESULT_FILE);
        let staging = self.root.join(format!("{RESULT_FILE}.tmp"));
        let bytes =
            serde_json::to_vec_pretty(&self.document).map_err(|e| Error::source("delete", e))?;
        fs::write(&staging, bytes)
            .map_err(|e| Error::source("delete", format!("{}: {e}", staging.display())))?;
        fs::rename(&staging, &path)
            .map_err(|e| Error::source("delete", format!("{}: {e}", path.display())))
    }
}

impl MessageSource for ArchiveSource {
    fn next_message(&mut self) -> Result<Option<Message>> {
        Ok(self.pending.pop_front())
    }

    fn download(&mut self, media: &MediaDescriptor) -> Result<Vec<u8>> {
        let path = self.root.join(&media.handle);
        fs::read(&path).map_err(|e| Error::source("download", format!("{}: {e}", path.display())))
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    fn delete(&mut self, message: &Message) -> Result<()> {
        self.remove_from_document(message.id)?;
        self.persist()?;
        if let Some(media) = message.media() {
            if self.release(&media.handle) {
                let path = self.root.join(&media.handle);
                fs::remove_file(&path)
                    .map_err(|e| Error::source("delete", format!("{}: {e}", path.display())))?;
            } else {
                debug!(handle = %media.handle, "Media file still referenced, keeping it");
            }
        }
        debug!("Deleted message from archive");
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::source("fetch", format!("{}: {e}", path.display())))?;
    serde_json::from_str(&contents).map_err(|e| Error::source("fetch", e))
}

/// Media file a raw message refers to, if any.
fn media_handle(message: &Value) -> Option<&str> {
    message
        .get("photo")
        .or_else(|| message.get("file"))
        .and_then(Value::as_str)
        .filter(|handle| !handle.starts_with(FILE_NOT_INCLUDED))
}

fn chat_kind(kind: &str) -> Option<ChannelKind> {
    match kind {
        "public_channel" | "private_channel" => Some(ChannelKind::Channel),
        "private_group" | "private_supergroup" | "public_supergroup" => Some(ChannelKind::Group),
        _ => None,
    }
}

/// Message as it appears in `result.json`.
#[derive(Debug, Deserialize)]
struct RawMessage {
    id: i64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    date_unixtime: Option<String>,
    #[serde(default)]
    from_id: Option<String>,
    #[serde(default)]
    text: RawText,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Message text: either a plain string or a list of formatted entities.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawText {
    Plain(String),
    Entities(Vec<RawEntity>),
}

impl Default for RawText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl RawText {
    fn flatten(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Entities(entities) => entities
                .iter()
                .map(|entity| match entity {
                    RawEntity::Plain(text) | RawEntity::Styled { text } => text.as_str(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntity {
    Plain(String),
    Styled { text: String },
}

impl RawMessage {
    fn timestamp(&self) -> Result<DateTime<Utc>> {
        if let Some(ts) = self
            .date_unixtime
            .as_deref()
            .and_then(|secs| secs.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            return Ok(ts);
        }
        self.date
            .as_deref()
            .and_then(|date| NaiveDateTime::parse_from_str(date, DATE_FORMAT).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| Error::source("fetch", format!("message {} has no valid date", self.id)))
    }

    fn content(&self) -> Content {
        if self.kind == "service" {
            return Content::None;
        }

        let media = self
            .photo
            .as_ref()
            .map(|photo| MediaDescriptor::new(photo).with_mime_type(PHOTO_MIME))
            .or_else(|| {
                self.file.as_ref().map(|file| {
                    let media = MediaDescriptor::new(file);
                    match &self.mime_type {
                        Some(mime) => media.with_mime_type(mime),
                        None => media,
                    }
                })
            });

        if let Some(media) = media {
            if media.handle.starts_with(FILE_NOT_INCLUDED) {
                warn!(message_id = self.id, "Media not included in export, skipping");
                return Content::None;
            }
            return Content::Media(media);
        }

        let text = self.text.flatten();
        if text.trim().is_empty() {
            Content::None
        } else {
            Content::Text(text)
        }
    }

    fn into_message(self) -> Result<Message> {
        let timestamp = self.timestamp()?;
        let content = self.content();
        let mut message = Message::new(MessageId::new(self.id), 0, timestamp, content);
        message.author = self.from_id.map(AuthorId::new);
        Ok(message)
    }
}
