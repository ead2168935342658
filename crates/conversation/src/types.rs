use crate::error::ConversationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Normalized author of a conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Author {
    /// The human user
    User,
    /// Model output (`assistant` and `tool` roles)
    ChatGpt,
    /// A system message the user wrote themselves (custom instructions)
    CustomUserInfo,
    /// Any other role, kept verbatim
    Other(String),
}

impl Author {
    pub const USER: &'static str = "user";
    pub const CHATGPT: &'static str = "ChatGPT";
    pub const CUSTOM_USER_INFO: &'static str = "Custom user info";

    /// Normalize a raw role string.
    ///
    /// `user_system_message` is the archive's `is_user_system_message` metadata flag and only
    /// matters for the `system` role. Already-normalized names map back onto themselves, so
    /// `Author::normalize(author.as_str(), false) == author` for every author.
    #[must_use]
    pub fn normalize(role: &str, user_system_message: bool) -> Self {
        match role {
            "user" => Self::User,
            "assistant" | "tool" | Self::CHATGPT => Self::ChatGpt,
            "system" if user_system_message => Self::CustomUserInfo,
            Self::CUSTOM_USER_INFO => Self::CustomUserInfo,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => Self::USER,
            Self::ChatGpt => Self::CHATGPT,
            Self::CustomUserInfo => Self::CUSTOM_USER_INFO,
            Self::Other(role) => role,
        }
    }

    /// Whether this author counts as the human side when pairing replies with context
    #[must_use]
    pub const fn is_user_equivalent(&self) -> bool {
        matches!(self, Self::User | Self::CustomUserInfo)
    }

    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::ChatGpt)
    }
}

impl From<String> for Author {
    fn from(role: String) -> Self {
        Self::normalize(&role, false)
    }
}

impl From<Author> for String {
    fn from(author: Author) -> Self {
        match author {
            Author::Other(role) => role,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified unit of message content.
///
/// Serializes as the single-key objects used by the visualization client:
/// `{"text": ..}`, `{"transcript": ..}`, `{"asset": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fragment {
    Text(String),
    /// Audio transcription text
    Transcript(String),
    /// Opaque image/audio/video/frame pointer, kept as the archive wrote it
    Asset(Value),
}

impl Fragment {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) | Self::Transcript(text) => text.is_empty(),
            Self::Asset(pointer) => pointer.is_null(),
        }
    }
}

/// A cleaned conversation turn.
///
/// Always carries at least one non-empty fragment; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MessageRecord")]
pub struct Message {
    id: String,
    conversation_id: String,
    #[serde(rename = "title")]
    conversation_title: String,
    author: Author,
    parts: Vec<Fragment>,
    #[serde(rename = "parent")]
    parent_id: Option<String>,
    #[serde(rename = "children")]
    children_ids: Vec<String>,
}

impl Message {
    /// Build a message, dropping empty fragments.
    ///
    /// Returns `None` when nothing is left after dropping.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        conversation_title: impl Into<String>,
        author: Author,
        parts: Vec<Fragment>,
        parent_id: Option<String>,
        children_ids: Vec<String>,
    ) -> Option<Self> {
        let parts: Vec<Fragment> = parts.into_iter().filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return None;
        }
        Some(Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            conversation_title: conversation_title.into(),
            author,
            parts,
            parent_id: parent_id.filter(|p| !p.is_empty()),
            children_ids,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    #[must_use]
    pub fn conversation_title(&self) -> &str {
        &self.conversation_title
    }

    #[must_use]
    pub const fn author(&self) -> &Author {
        &self.author
    }

    #[must_use]
    pub fn parts(&self) -> &[Fragment] {
        &self.parts
    }

    /// Id of the preceding node in the raw tree
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    #[must_use]
    pub fn children_ids(&self) -> &[String] {
        &self.children_ids
    }

    /// Text fragments joined by newlines, in part order. Transcripts and assets are ignored.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Fragment::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Deserialize)]
struct MessageRecord {
    id: String,
    #[serde(default)]
    conversation_id: String,
    #[serde(default)]
    title: String,
    author: Author,
    parts: Vec<Fragment>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    children: Vec<String>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = ConversationError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let id = record.id.clone();
        Self::new(
            record.id,
            record.conversation_id,
            record.title,
            record.author,
            record.parts,
            record.parent,
            record.children,
        )
        .ok_or_else(|| ConversationError::invalid_message(format!("{id} has no content parts")))
    }
}
