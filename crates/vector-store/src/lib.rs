//! # TreeGPT Vector Store
//!
//! Embeds assistant replies together with their user context and keeps the results
//! addressable by message id.
//!
//! ## Architecture
//!
//! ```text
//! (context, reply) pairs
//!     │
//!     ├──> EmbeddingAggregator
//!     │      ├─ text = context + "\n" + reply
//!     │      ├─ over budget: TextChunker -> embed each chunk -> element-wise mean
//!     │      └─ otherwise: embed whole text
//!     │
//!     ├──> EmbeddingModel (TextEmbedder)
//!     │      ├─ fast: ONNX Runtime + tokenizer, mean pooling, L2 norm
//!     │      └─ stub: deterministic hash vectors
//!     │
//!     └──> VectorStore
//!            ├─ Lookup by reply id / context id
//!            └─ JSON persistence with schema_version
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use treegpt_vector_store::{EmbeddingAggregator, EmbeddingModel, VectorStore};
//! use treegpt_conversation::{reply_pairs, MessageStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let messages = MessageStore::new();
//!     let model = EmbeddingModel::new()?;
//!     let counter = model.token_counter()?;
//!     let aggregator = EmbeddingAggregator::new(400)?;
//!
//!     let mut store = VectorStore::new();
//!     for pair in reply_pairs(&messages) {
//!         if let Some(embedded) = aggregator
//!             .embed_pair(pair.context, pair.reply, counter.as_ref(), &model)
//!             .await?
//!         {
//!             store.add(pair.context.cloned(), pair.reply.clone(), embedded.vector)?;
//!         }
//!     }
//!     store.save("prepared_messages.json").await?;
//!     Ok(())
//! }
//! ```

mod aggregator;
mod embeddings;
mod error;
pub mod paths;
mod store;
mod types;

pub use aggregator::{mean_vectors, EmbeddingAggregator};
pub use embeddings::{
    current_model_id, EmbeddingMode, EmbeddingModel, TextEmbedder,
    DEFAULT_MODEL_ID,
};
pub use error::{Result, VectorStoreError};
pub use store::{VectorStore, VECTOR_STORE_SCHEMA_VERSION};
pub use types::{ContextedVector, PairEmbedding};
