use crate::error::{Result, VectorStoreError};
use crate::types::ContextedVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use treegpt_conversation::Message;

pub const VECTOR_STORE_SCHEMA_VERSION: u32 = 1;

/// Append-only registry of embedded replies, indexed by reply id and context id.
///
/// Lookups return the first entry inserted for an id.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    entries: Vec<ContextedVector>,
    by_reply: HashMap<String, usize>,
    by_context: HashMap<String, usize>,
}

#[derive(Serialize)]
struct PersistedStoreRef<'a> {
    schema_version: u32,
    dimension: Option<usize>,
    vectors: &'a [ContextedVector],
}

#[derive(Deserialize)]
struct PersistedStore {
    schema_version: u32,
    vectors: Vec<ContextedVector>,
}

impl VectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Every vector must match the dimension of the first one.
    pub fn add(&mut self, context: Option<Message>, reply: Message, vector: Vec<f32>) -> Result<()> {
        self.push(ContextedVector {
            context,
            reply,
            vector,
        })
    }

    pub fn push(&mut self, entry: ContextedVector) -> Result<()> {
        if entry.vector.is_empty() {
            return Err(VectorStoreError::Other(format!(
                "Empty vector for reply {}",
                entry.reply_id()
            )));
        }
        if let Some(expected) = self.dimension() {
            if entry.vector.len() != expected {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: entry.vector.len(),
                });
            }
        }

        let idx = self.entries.len();
        if self.by_reply.contains_key(entry.reply_id()) {
            log::warn!("Duplicate reply id {} in vector store", entry.reply_id());
        } else {
            self.by_reply.insert(entry.reply_id().to_string(), idx);
        }
        if let Some(context_id) = entry.context_id() {
            self.by_context.entry(context_id.to_string()).or_insert(idx);
        }
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub fn get_by_reply_id(&self, id: &str) -> Option<&ContextedVector> {
        let found = self.by_reply.get(id).map(|&idx| &self.entries[idx]);
        if found.is_none() {
            log::debug!("No vector for reply id '{id}'");
        }
        found
    }

    #[must_use]
    pub fn get_by_context_id(&self, id: &str) -> Option<&ContextedVector> {
        let found = self.by_context.get(id).map(|&idx| &self.entries[idx]);
        if found.is_none() {
            log::debug!("No vector for context id '{id}'");
        }
        found
    }

    #[must_use]
    pub fn all(&self) -> &[ContextedVector] {
        &self.entries
    }

    /// Dimension shared by all vectors, `None` while empty.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|entry| entry.vector.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        log::info!("Saving {} vectors to {}", self.len(), path.display());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedStoreRef {
            schema_version: VECTOR_STORE_SCHEMA_VERSION,
            dimension: self.dimension(),
            vectors: &self.entries,
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedStore = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != VECTOR_STORE_SCHEMA_VERSION {
            return Err(VectorStoreError::SchemaMismatch {
                found: persisted.schema_version,
                expected: VECTOR_STORE_SCHEMA_VERSION,
            });
        }

        let mut store = Self::new();
        for entry in persisted.vectors {
            store.push(entry)?;
        }
        log::info!("Loaded {} vectors from {}", store.len(), path.display());
        Ok(store)
    }
}
