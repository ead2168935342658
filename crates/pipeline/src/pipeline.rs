use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::stats::{EmbedStats, GraphStats, IngestStats};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use treegpt_conversation::{reply_pairs, ConversationLinearizer, Message, MessageStore, RawConversation};
use treegpt_graph::{GraphAssembler, GraphNode, ProjectionService};
use treegpt_text_chunker::TokenCounter;
use treegpt_vector_store::{EmbeddingAggregator, PairEmbedding, TextEmbedder, VectorStore};

/// Archive to graph in three phases: ingest, embed, assemble.
///
/// Each phase owns its output store and hands it to the next; nothing is shared
/// between runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    linearizer: ConversationLinearizer,
    aggregator: EmbeddingAggregator,
    assembler: GraphAssembler,
}

struct EmbedJob {
    index: usize,
    context: Option<Message>,
    reply: Message,
}

type EmbedOutcome = (usize, treegpt_vector_store::Result<Option<PairEmbedding>>);

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let aggregator = EmbeddingAggregator::new(config.max_tokens)?;
        Ok(Self {
            config,
            linearizer: ConversationLinearizer::new(),
            aggregator,
            assembler: GraphAssembler::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Linearize conversations (up to `conversation_limit`) into one message store.
    #[must_use]
    pub fn ingest(&self, conversations: &[RawConversation]) -> (MessageStore, IngestStats) {
        let take = self
            .config
            .conversation_limit
            .map_or(conversations.len(), |limit| limit.min(conversations.len()));
        let mut stats = IngestStats {
            conversations_seen: conversations.len(),
            conversations_skipped: conversations.len() - take,
            ..IngestStats::default()
        };

        let mut store = MessageStore::new();
        for conversation in &conversations[..take] {
            let linearized = self.linearizer.linearize(conversation);
            if !linearized.outcome.is_complete() {
                stats.conversations_truncated += 1;
            }
            stats.nodes_visited += linearized.nodes_visited;
            stats.messages_ingested += linearized.messages.len();
            store.add_all(linearized.messages);
        }

        log::info!(
            "Ingested {} messages from {} conversations ({} truncated)",
            stats.messages_ingested,
            take,
            stats.conversations_truncated
        );
        (store, stats)
    }

    /// Pair every assistant reply with its context and embed it.
    ///
    /// Up to `embed_concurrency` replies are in flight at once. Results are written in
    /// store order by this task alone, so the output does not depend on scheduling. A
    /// failed reply is logged and skipped without affecting the others.
    pub async fn embed(
        &self,
        messages: &MessageStore,
        embedder: Arc<dyn TextEmbedder>,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<(VectorStore, EmbedStats)> {
        let jobs: Vec<EmbedJob> = reply_pairs(messages)
            .enumerate()
            .map(|(index, pair)| EmbedJob {
                index,
                context: pair.context.cloned(),
                reply: pair.reply.clone(),
            })
            .collect();

        let mut stats = EmbedStats {
            replies_seen: jobs.len(),
            replies_without_context: jobs.iter().filter(|job| job.context.is_none()).count(),
            ..EmbedStats::default()
        };

        let concurrency = self.config.resolved_embed_concurrency();
        log::info!(
            "Embedding {} replies (concurrency {concurrency}, max_tokens {})",
            jobs.len(),
            self.aggregator.max_tokens()
        );

        let mut slots: Vec<Option<treegpt_vector_store::Result<Option<PairEmbedding>>>> =
            (0..jobs.len()).map(|_| None).collect();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks: JoinSet<EmbedOutcome> = JoinSet::new();

        for job in &jobs {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Other(format!("Embedding semaphore closed: {e}")))?;
            let aggregator = self.aggregator;
            let embedder = embedder.clone();
            let counter = counter.clone();
            let index = job.index;
            let context = job.context.clone();
            let reply = job.reply.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = aggregator
                    .embed_pair(context.as_ref(), &reply, counter.as_ref(), embedder.as_ref())
                    .await;
                (index, result)
            });

            // Collect whatever already finished so slots fill as we go.
            while let Some(joined) = tasks.try_join_next() {
                record_outcome(joined, &mut slots);
            }
        }
        while let Some(joined) = tasks.join_next().await {
            record_outcome(joined, &mut slots);
        }

        let mut store = VectorStore::new();
        for (job, slot) in jobs.into_iter().zip(slots) {
            match slot {
                Some(Ok(Some(embedded))) => {
                    if embedded.chunks > 1 {
                        stats.replies_chunked += 1;
                    }
                    stats.chunks_embedded += embedded.chunks;
                    let reply_id = job.reply.id().to_string();
                    match store.add(job.context, job.reply, embedded.vector) {
                        Ok(()) => stats.replies_embedded += 1,
                        Err(e) => {
                            log::warn!("Skipping reply {reply_id}: {e}");
                            stats.replies_failed += 1;
                        }
                    }
                }
                Some(Ok(None)) => {
                    log::debug!("Reply {} has no text to embed", job.reply.id());
                    stats.replies_skipped += 1;
                }
                Some(Err(e)) => {
                    log::warn!("Failed to embed reply {}: {e}", job.reply.id());
                    stats.replies_failed += 1;
                }
                None => {
                    log::warn!("Embedding task for reply {} did not finish", job.reply.id());
                    stats.replies_failed += 1;
                }
            }
        }

        log::info!(
            "Embedded {} replies ({} chunked, {} skipped, {} failed)",
            stats.replies_embedded,
            stats.replies_chunked,
            stats.replies_skipped,
            stats.replies_failed
        );
        Ok((store, stats))
    }

    /// Project, cluster and assemble the graph. A projection that does not line up with the
    /// vectors aborts the run.
    pub fn assemble(
        &self,
        vectors: &VectorStore,
        projector: &dyn ProjectionService,
    ) -> Result<(Vec<GraphNode>, GraphStats)> {
        let nodes = self.assembler.assemble_with(vectors.all(), projector)?;
        let mut clusters: Vec<i32> = nodes
            .iter()
            .filter(|node| !node.is_noise())
            .map(|node| node.cluster)
            .collect();
        clusters.sort_unstable();
        clusters.dedup();
        let stats = GraphStats {
            nodes: nodes.len(),
            clusters: clusters.len(),
            noise: nodes.iter().filter(|node| node.is_noise()).count(),
        };
        Ok((nodes, stats))
    }
}

fn record_outcome(
    joined: std::result::Result<EmbedOutcome, tokio::task::JoinError>,
    slots: &mut [Option<treegpt_vector_store::Result<Option<PairEmbedding>>>],
) {
    match joined {
        Ok((index, result)) => slots[index] = Some(result),
        Err(e) => log::warn!("Embedding task panicked: {e}"),
    }
}
