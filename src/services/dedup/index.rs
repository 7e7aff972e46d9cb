//! Duplicate index.
//!
//! Two append-only mappings from fingerprint to the ordered list of messages
//! that produced it: one for media, one for text. Groups keep insertion order
//! both across keys and within a group, so member 0 is always the earliest
//! arrival.

use std::fmt;

use indexmap::IndexMap;

use super::fingerprint::Fingerprint;
use crate::models::Message;

/// Index namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Media fingerprints (perceptual and content hashes).
    Media,
    /// Text fingerprints.
    Text,
}

impl Namespace {
    /// Both namespaces, in resolution order.
    pub const ALL: [Self; 2] = [Self::Media, Self::Text];

    /// Returns the namespace as a label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Groups = IndexMap<Fingerprint, Vec<Message>>;

/// Fingerprint groups accumulated during one scan.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    media: Groups,
    text: Groups,
}

impl DuplicateIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to the group of `fingerprint`, creating the group if
    /// needed. Returns the group size after the append.
    pub fn append(&mut self, fingerprint: Fingerprint, message: Message) -> usize {
        let group = self.groups_mut(fingerprint.namespace()).entry(fingerprint).or_default();
        group.push(message);
        group.len()
    }

    /// Returns the members of a group, oldest first.
    #[must_use]
    pub fn group(&self, fingerprint: &Fingerprint) -> Option<&[Message]> {
        self.groups(fingerprint.namespace())
            .get(fingerprint)
            .map(Vec::as_slice)
    }

    /// Iterates the groups of a namespace in first-seen order.
    pub fn iter(&self, namespace: Namespace) -> impl Iterator<Item = (&Fingerprint, &[Message])> {
        self.groups(namespace)
            .iter()
            .map(|(fp, members)| (fp, members.as_slice()))
    }

    /// Iterates the groups of a namespace with at least two members.
    pub fn duplicates(
        &self,
        namespace: Namespace,
    ) -> impl Iterator<Item = (&Fingerprint, &[Message])> {
        self.iter(namespace).filter(|(_, members)| members.len() > 1)
    }

    /// Returns the number of distinct fingerprints in a namespace.
    #[must_use]
    pub fn len(&self, namespace: Namespace) -> usize {
        self.groups(namespace).len()
    }

    /// Returns `true` if neither namespace holds a group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.media.is_empty() && self.text.is_empty()
    }

    const fn groups(&self, namespace: Namespace) -> &Groups {
        match namespace {
            Namespace::Media => &self.media,
            Namespace::Text => &self.text,
        }
    }

    const fn groups_mut(&mut self, namespace: Namespace) -> &mut Groups {
        match namespace {
            Namespace::Media => &mut self.media,
            Namespace::Text => &mut self.text,
        }
    }
}
