//! Typed items for the dashboard features backed by ordered collections.
//!
//! # Responsibility
//! - Name the UI features that hold an ordered collection.
//! - Provide typed records whose sort keys match their wire field names.
//!
//! # Invariants
//! - Every typed item has a non-optional id.
//! - `sort_key(field)` accepts exactly the serialized field names.

use crate::model::item::{CollectionItem, ItemId, SortKey};
use serde::{Deserialize, Serialize};

/// UI feature owning one ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionFeature {
    /// Conversation list in the chat app.
    ChatThreads,
    /// Messages of the open chat conversation.
    ChatMessages,
    /// Posts on the social feed page.
    FeedItems,
    /// Mailbox listing in the email app.
    MailList,
}

impl CollectionFeature {
    pub const ALL: [CollectionFeature; 4] = [
        Self::ChatThreads,
        Self::ChatMessages,
        Self::FeedItems,
        Self::MailList,
    ];

    /// Stable string id used across the FFI boundary and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatThreads => "chat_threads",
            Self::ChatMessages => "chat_messages",
            Self::FeedItems => "feed_items",
            Self::MailList => "mail_list",
        }
    }

    /// Singular, user-facing noun used in notices.
    pub fn item_label(self) -> &'static str {
        match self {
            Self::ChatThreads => "Conversation",
            Self::ChatMessages => "Message",
            Self::FeedItems => "Post",
            Self::MailList => "Email",
        }
    }

    /// Parses a stable string id; input is trimmed.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Unix epoch milliseconds of the newest message.
    pub last_message_at: i64,
    #[serde(default)]
    pub unread_count: u32,
}

impl CollectionItem for ChatThread {
    fn item_id(&self) -> Option<ItemId> {
        Some(self.id.clone())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "id" => Some(SortKey::from(&self.id)),
            "title" => Some(SortKey::from(self.title.as_str())),
            "last_message_at" => Some(SortKey::from(self.last_message_at)),
            "unread_count" => Some(SortKey::from(self.unread_count)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ItemId,
    pub thread_id: ItemId,
    pub author: String,
    pub body: String,
    /// Unix epoch milliseconds.
    pub sent_at: i64,
}

impl CollectionItem for ChatMessage {
    fn item_id(&self) -> Option<ItemId> {
        Some(self.id.clone())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "id" => Some(SortKey::from(&self.id)),
            "thread_id" => Some(SortKey::from(&self.thread_id)),
            "author" => Some(SortKey::from(self.author.as_str())),
            "sent_at" => Some(SortKey::from(self.sent_at)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: ItemId,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub likes: u32,
    /// Unix epoch milliseconds.
    pub posted_at: i64,
}

impl CollectionItem for FeedPost {
    fn item_id(&self) -> Option<ItemId> {
        Some(self.id.clone())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "id" => Some(SortKey::from(&self.id)),
            "author" => Some(SortKey::from(self.author.as_str())),
            "likes" => Some(SortKey::from(self.likes)),
            "posted_at" => Some(SortKey::from(self.posted_at)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: ItemId,
    pub from: String,
    pub subject: String,
    /// Unix epoch milliseconds.
    pub received_at: i64,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub read: bool,
}

impl CollectionItem for MailMessage {
    fn item_id(&self) -> Option<ItemId> {
        Some(self.id.clone())
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        match field {
            "id" => Some(SortKey::from(&self.id)),
            "from" => Some(SortKey::from(self.from.as_str())),
            "subject" => Some(SortKey::from(self.subject.as_str())),
            "received_at" => Some(SortKey::from(self.received_at)),
            "starred" => Some(SortKey::from(self.starred)),
            "read" => Some(SortKey::from(self.read)),
            _ => None,
        }
    }
}
