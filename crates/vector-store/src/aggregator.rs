use crate::embeddings::TextEmbedder;
use crate::error::{Result, VectorStoreError};
use crate::types::PairEmbedding;
use ndarray::{Array2, Axis};
use treegpt_conversation::Message;
use treegpt_text_chunker::{ChunkerConfig, TextChunker, TokenCounter};

/// Turns a (context, reply) pair into one vector
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingAggregator {
    chunker: TextChunker,
}

impl EmbeddingAggregator {
    pub fn new(max_tokens: usize) -> Result<Self> {
        let chunker = TextChunker::new(ChunkerConfig { max_tokens })?;
        Ok(Self { chunker })
    }

    #[must_use]
    pub const fn max_tokens(&self) -> usize {
        self.chunker.max_tokens()
    }

    /// Text embedded for a pair: `context + "\n" + reply`, or the reply alone when the
    /// context is absent or has no text.
    #[must_use]
    pub fn pair_text(context: Option<&Message>, reply: &Message) -> String {
        let reply_text = reply.text();
        match context.map(Message::text) {
            Some(context_text) if !context_text.is_empty() => {
                format!("{context_text}\n{reply_text}")
            }
            _ => reply_text,
        }
    }

    /// Embed one pair. `None` when the pair has no text.
    ///
    /// Text over the token budget is chunked, each chunk embedded, and the chunk vectors
    /// averaged element-wise.
    pub async fn embed_pair(
        &self,
        context: Option<&Message>,
        reply: &Message,
        counter: &dyn TokenCounter,
        embedder: &dyn TextEmbedder,
    ) -> Result<Option<PairEmbedding>> {
        let text = Self::pair_text(context, reply);
        if text.is_empty() {
            return Ok(None);
        }

        if !self.chunker.exceeds_limit(&text, counter)? {
            let vector = embedder.embed(&text).await?;
            return Ok(Some(PairEmbedding { vector, chunks: 1 }));
        }

        let chunks = self.chunker.chunk(&text, counter)?;
        log::debug!("Reply {} split into {} chunks", reply.id(), chunks.len());
        let vectors = embedder
            .embed_batch(chunks.iter().map(String::as_str).collect())
            .await?;
        if vectors.len() != chunks.len() {
            return Err(VectorStoreError::embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        let vector = mean_vectors(&vectors)?;
        Ok(Some(PairEmbedding {
            vector,
            chunks: chunks.len(),
        }))
    }
}

/// Element-wise arithmetic mean of equally sized vectors.
pub fn mean_vectors(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let Some(first) = vectors.first() else {
        return Err(VectorStoreError::embedding("Cannot average zero vectors"));
    };
    let dimension = first.len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(VectorStoreError::InvalidDimension {
            expected: dimension,
            actual: bad.len(),
        });
    }

    let flat: Vec<f32> = vectors.iter().flatten().copied().collect();
    let matrix = Array2::from_shape_vec((vectors.len(), dimension), flat)
        .map_err(|e| VectorStoreError::Other(format!("Vector shape error: {e}")))?;
    matrix
        .mean_axis(Axis(0))
        .map(|mean| mean.to_vec())
        .ok_or_else(|| VectorStoreError::embedding("Cannot average zero vectors"))
}
