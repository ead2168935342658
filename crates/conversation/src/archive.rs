use crate::error::Result;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// One conversation as stored in `conversations.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConversation {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, alias = "id")]
    pub conversation_id: Option<String>,

    /// Leaf of the active branch
    #[serde(default)]
    pub current_node: Option<String>,

    /// Node id -> node, kept undecoded until the walk reaches it
    #[serde(default, deserialize_with = "null_as_default")]
    pub mapping: HashMap<String, Value>,
}

impl RawConversation {
    #[must_use]
    pub fn id(&self) -> &str {
        self.conversation_id.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Decode the node stored under `id`.
    ///
    /// A node that does not match the expected shape keeps whatever links it has and
    /// loses its message, so one damaged node never hides the rest of the tree.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<RawNode> {
        let value = self.mapping.get(id)?;
        match RawNode::deserialize(value) {
            Ok(node) => Some(node),
            Err(err) => {
                log::warn!(
                    "Conversation {} has malformed node {id}, keeping only its links: {err}",
                    self.id()
                );
                Some(RawNode::links_only(value))
            }
        }
    }
}

/// A point in the conversation tree; may carry no message at all (e.g. the synthetic root)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub message: Option<RawMessage>,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<String>,
}

impl RawNode {
    /// `id`, `parent` and string `children` of a node whose message could not be read
    fn links_only(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: text("id"),
            message: None,
            parent: text("parent"),
            children: value
                .get("children")
                .and_then(Value::as_array)
                .map(|children| {
                    children
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub author: RawAuthor,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,

    #[serde(default)]
    pub content: Option<RawContent>,
}

impl RawMessage {
    /// The archive's `is_user_system_message` flag
    #[must_use]
    pub fn is_user_system_message(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("is_user_system_message"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthor {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContent {
    #[serde(default)]
    pub content_type: String,

    /// Heterogeneous: plain strings or typed objects
    #[serde(default)]
    pub parts: Option<Vec<Value>>,
}

impl RawContent {
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self.content_type.as_str(), "text" | "multimodal_text")
    }

    #[must_use]
    pub fn parts(&self) -> &[Value] {
        self.parts.as_deref().unwrap_or_default()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse an export from memory.
///
/// The top level must be a JSON array. Individual conversations that do not match the
/// expected shape are logged and skipped.
pub fn parse_archive(bytes: &[u8]) -> Result<Vec<RawConversation>> {
    let entries: Vec<Value> = serde_json::from_slice(bytes)?;
    let total = entries.len();

    let mut conversations = Vec::with_capacity(total);
    for (idx, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<RawConversation>(entry) {
            Ok(conversation) => conversations.push(conversation),
            Err(err) => log::warn!("Skipping malformed conversation #{idx}: {err}"),
        }
    }

    log::debug!(
        "Parsed {} of {} conversations",
        conversations.len(),
        total
    );
    Ok(conversations)
}

/// Read and parse a `conversations.json` export
pub async fn load_archive(path: impl AsRef<Path>) -> Result<Vec<RawConversation>> {
    let path = path.as_ref();
    log::info!("Loading archive from {}", path.display());
    let bytes = tokio::fs::read(path).await?;
    parse_archive(&bytes)
}
