//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;

use chatdedup::source::{ChannelResolver, MessageSource};
use chatdedup::{Channel, ChannelKind, Content, Error, MediaDescriptor, Message, MessageId, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use image::{ImageFormat, Rgb, RgbImage};

/// In-memory message source that records every delete.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    pub messages: VecDeque<Message>,
    pub blobs: HashMap<String, Vec<u8>>,
    pub deleted: Vec<i64>,
    pub downloads: usize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a media message whose payload is `bytes`.
    pub fn media(mut self, id: i64, bytes: &[u8]) -> Self {
        self.push_media(id, None, bytes, None);
        self
    }

    /// Adds a media message posted by `author`.
    pub fn media_by(mut self, id: i64, author: &str, bytes: &[u8]) -> Self {
        self.push_media(id, Some(author), bytes, None);
        self
    }

    /// Adds a video message.
    pub fn video(mut self, id: i64, bytes: &[u8]) -> Self {
        self.push_media(id, None, bytes, Some("video/mp4"));
        self
    }

    /// Adds a text message.
    pub fn text(mut self, id: i64, body: &str) -> Self {
        let position = self.messages.len();
        self.messages.push_back(Message::new(
            MessageId::new(id),
            0,
            timestamp(position),
            Content::Text(body.to_string()),
        ));
        self
    }

    /// Adds a message without content.
    pub fn empty(mut self, id: i64) -> Self {
        let position = self.messages.len();
        self.messages
            .push_back(Message::new(MessageId::new(id), 0, timestamp(position), Content::None));
        self
    }

    fn push_media(&mut self, id: i64, author: Option<&str>, bytes: &[u8], mime: Option<&str>) {
        let mut media = MediaDescriptor::new(format!("media/{id}"));
        if let Some(mime) = mime {
            media = media.with_mime_type(mime);
        }
        self.blobs.insert(media.handle.clone(), bytes.to_vec());
        let position = self.messages.len();
        let mut message =
            Message::new(MessageId::new(id), 0, timestamp(position), Content::Media(media));
        if let Some(author) = author {
            message = message.with_author(author);
        }
        self.messages.push_back(message);
    }
}

impl MessageSource for MemorySource {
    fn next_message(&mut self) -> Result<Option<Message>> {
        Ok(self.messages.pop_front())
    }

    fn download(&mut self, media: &MediaDescriptor) -> Result<Vec<u8>> {
        self.downloads += 1;
        self.blobs
            .get(&media.handle)
            .cloned()
            .ok_or_else(|| Error::source("download", format!("no payload for {}", media.handle)))
    }

    fn delete(&mut self, message: &Message) -> Result<()> {
        self.deleted.push(message.id.get());
        Ok(())
    }
}

/// Resolver exposing one named channel backed by a [`MemorySource`].
pub struct MemoryResolver {
    pub name: String,
    pub source: MemorySource,
}

impl ChannelResolver for MemoryResolver {
    type Source = MemorySource;

    fn resolve(&self, name: &str) -> Result<Option<Channel>> {
        Ok((name == self.name).then(|| Channel {
            id: 42,
            name: name.to_string(),
            kind: ChannelKind::Channel,
        }))
    }

    fn open(&self, _channel: &Channel) -> Result<MemorySource> {
        Ok(self.source.clone())
    }
}

/// Deterministic timestamps, one minute apart.
pub fn timestamp(position: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        + Duration::minutes(i64::try_from(position).unwrap())
}

/// Horizontal gradient encoded as `format`; its dHash is all ones.
pub fn gradient(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        let v = u8::try_from(x * 255 / (width - 1)).unwrap();
        Rgb([v, v, v])
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, format).expect("encode image");
    bytes.into_inner()
}

/// Vertical bands; a different picture from [`gradient`].
pub fn stripes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        let v = if (x * 8 / width) % 2 == 0 { 250 } else { 5 };
        Rgb([v, v, v])
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).expect("encode image");
    bytes.into_inner()
}
