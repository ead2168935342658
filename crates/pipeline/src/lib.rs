//! # TreeGPT Pipeline
//!
//! Runs a chat-export archive through every phase up to the exported graph.
//!
//! ## Pipeline
//!
//! ```text
//! RawConversation[]
//!     │
//!     ├──> ingest   (ConversationLinearizer per conversation)
//!     │      └─> MessageStore
//!     │
//!     ├──> embed    (context pairing + EmbeddingAggregator, bounded concurrency)
//!     │      └─> VectorStore
//!     │
//!     └──> assemble (ProjectionService + GraphAssembler)
//!            └─> GraphNode[]
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use treegpt_conversation::load_archive;
//! use treegpt_pipeline::{Pipeline, PipelineConfig};
//! use treegpt_vector_store::EmbeddingModel;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::default();
//!     let projector = config.clustering.projector()?;
//!     let pipeline = Pipeline::new(config)?;
//!
//!     let conversations = load_archive("conversations.json").await?;
//!     let (messages, _) = pipeline.ingest(&conversations);
//!
//!     let model = EmbeddingModel::new()?;
//!     let counter = model.token_counter()?;
//!     let (vectors, stats) = pipeline.embed(&messages, Arc::new(model), counter).await?;
//!     println!("Embedded {} replies", stats.replies_embedded);
//!
//!     let (nodes, _) = pipeline.assemble(&vectors, &projector)?;
//!     treegpt_graph::write_graph("graph_data.json", &nodes).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod limits;
mod pipeline;
mod stats;

pub use config::{ClusteringConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use limits::{default_embed_concurrency, embed_concurrency_from_env};
pub use pipeline::Pipeline;
pub use stats::{EmbedStats, GraphStats, IngestStats, RunStats};
