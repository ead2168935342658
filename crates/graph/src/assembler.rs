use crate::error::{GraphError, Result};
use crate::projection::ProjectionService;
use crate::types::{GraphNode, Position};
use std::path::Path;
use treegpt_vector_store::ContextedVector;

/// Joins embedded replies with their projected positions and cluster labels
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphAssembler;

impl GraphAssembler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build one node per vector, in input order.
    ///
    /// `positions` and `labels` must be index-aligned with `vectors`; any length
    /// difference is a [`GraphError::LengthMismatch`].
    pub fn assemble(
        &self,
        vectors: &[ContextedVector],
        positions: &[[f32; 3]],
        labels: &[i32],
    ) -> Result<Vec<GraphNode>> {
        if positions.len() != vectors.len() || labels.len() != vectors.len() {
            return Err(GraphError::LengthMismatch {
                vectors: vectors.len(),
                positions: positions.len(),
                labels: labels.len(),
            });
        }

        Ok(vectors
            .iter()
            .zip(positions)
            .zip(labels)
            .map(|((entry, &position), &cluster)| {
                GraphNode::new(
                    entry.context.clone(),
                    entry.reply.clone(),
                    cluster,
                    Position::from(position),
                )
            })
            .collect())
    }

    /// Run `projector` over the vectors and assemble the result.
    pub fn assemble_with(
        &self,
        vectors: &[ContextedVector],
        projector: &dyn ProjectionService,
    ) -> Result<Vec<GraphNode>> {
        let raw: Vec<Vec<f32>> = vectors.iter().map(|entry| entry.vector.clone()).collect();
        let projection = projector.project_and_cluster(&raw)?;
        self.assemble(vectors, &projection.positions, &projection.labels)
    }
}

/// Write nodes as a pretty JSON array, order preserved.
pub async fn write_graph(path: impl AsRef<Path>, nodes: &[GraphNode]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(nodes)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    log::info!("Wrote {} graph nodes to {}", nodes.len(), path.display());
    Ok(())
}

pub async fn read_graph(path: impl AsRef<Path>) -> Result<Vec<GraphNode>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Projection;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use treegpt_conversation::{Author, Fragment, Message};

    fn message(id: &str, author: Author, parent: Option<String>) -> Message {
        Message::new(
            id,
            "c1",
            "Chat",
            author,
            vec![Fragment::Text(format!("text {id}"))],
            parent,
            vec![],
        )
        .unwrap()
    }

    fn vectors(n: usize) -> Vec<ContextedVector> {
        (0..n)
            .map(|i| ContextedVector {
                context: (i % 3 != 0).then(|| message(&format!("u{i}"), Author::User, None)),
                reply: message(&format!("r{i}"), Author::ChatGpt, Some(format!("u{i}"))),
                vector: vec![i as f32, 1.0],
            })
            .collect()
    }

    /// Positions `(i, i, i)` and labels `i % 2`.
    struct IndexProjector;

    impl ProjectionService for IndexProjector {
        fn project_and_cluster(&self, vectors: &[Vec<f32>]) -> Result<Projection> {
            Ok(Projection {
                positions: (0..vectors.len()).map(|i| [i as f32; 3]).collect(),
                labels: (0..vectors.len()).map(|i| (i % 2) as i32).collect(),
            })
        }
    }

    /// Drops the last label.
    struct ShortProjector;

    impl ProjectionService for ShortProjector {
        fn project_and_cluster(&self, vectors: &[Vec<f32>]) -> Result<Projection> {
            let mut projection = IndexProjector.project_and_cluster(vectors)?;
            projection.labels.pop();
            Ok(projection)
        }
    }

    #[test]
    fn nodes_follow_input_order() {
        let input = vectors(5);
        let nodes = GraphAssembler::new()
            .assemble_with(&input, &IndexProjector)
            .unwrap();

        assert_eq!(nodes.len(), 5);
        for (i, (node, entry)) in nodes.iter().zip(&input).enumerate() {
            assert_eq!(node.id, entry.reply.id());
            assert_eq!(node.reply, entry.reply);
            assert_eq!(node.prompt, entry.context);
            assert_eq!(node.cluster, (i % 2) as i32);
            assert_eq!(node.position, Position::from([i as f32; 3]));
        }
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let input = vectors(3);
        let err = GraphAssembler::new()
            .assemble_with(&input, &ShortProjector)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::LengthMismatch {
                vectors: 3,
                positions: 3,
                labels: 2
            }
        ));

        let err = GraphAssembler::new()
            .assemble(&input, &[[0.0; 3]; 2], &[0, 0, 0])
            .unwrap_err();
        assert!(matches!(err, GraphError::LengthMismatch { positions: 2, .. }));
    }

    #[test]
    fn empty_input_assembles_to_nothing() {
        let nodes = GraphAssembler::new().assemble(&[], &[], &[]).unwrap();
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn written_graph_reads_back_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("graphs").join("graph_data.json");
        let nodes = GraphAssembler::new()
            .assemble_with(&vectors(4), &IndexProjector)
            .unwrap();

        write_graph(&path, &nodes).await.unwrap();
        let loaded = read_graph(&path).await.unwrap();
        assert_eq!(loaded, nodes);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[2]["position"]["y"], 2.0);
        assert_eq!(raw[2]["cluster"], 0);
    }
}
