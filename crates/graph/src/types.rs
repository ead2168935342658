use serde::{Deserialize, Serialize};
use treegpt_conversation::Message;

/// Cluster label DBSCAN gives points that belong to no cluster
pub const NOISE_LABEL: i32 = -1;

/// Point in the 3-D layout
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<[f32; 3]> for Position {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Position> for [f32; 3] {
    fn from(position: Position) -> Self {
        [position.x, position.y, position.z]
    }
}

/// One exported record: a reply with its prompt, cluster label and layout position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Reply id
    pub id: String,
    pub title: String,
    pub conversation_id: String,
    pub prompt: Option<Message>,
    pub reply: Message,
    pub cluster: i32,
    pub position: Position,
}

impl GraphNode {
    #[must_use]
    pub fn new(prompt: Option<Message>, reply: Message, cluster: i32, position: Position) -> Self {
        Self {
            id: reply.id().to_string(),
            title: reply.conversation_title().to_string(),
            conversation_id: reply.conversation_id().to_string(),
            prompt,
            reply,
            cluster,
            position,
        }
    }

    #[must_use]
    pub const fn is_noise(&self) -> bool {
        self.cluster == NOISE_LABEL
    }
}

/// Output of a projection/clustering pass, index-aligned with its input vectors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub positions: Vec<[f32; 3]>,
    pub labels: Vec<i32>,
}

impl Projection {
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of distinct non-noise labels
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        let mut labels: Vec<i32> = self
            .labels
            .iter()
            .copied()
            .filter(|&label| label != NOISE_LABEL)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }
}
