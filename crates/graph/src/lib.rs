//! # TreeGPT Graph
//!
//! Turns embedded replies into the exported 3-D graph.
//!
//! ## Architecture
//!
//! ```text
//! ContextedVector[]
//!     │
//!     ├──> ProjectionService
//!     │      ├─ DensityProjector: DBSCAN over cosine distance -> cluster labels
//!     │      └─ PCA -> 3-D positions
//!     │
//!     ├──> GraphAssembler
//!     │      ├─ Check positions/labels line up with the vectors
//!     │      └─ GraphNode { prompt, reply, cluster, position }
//!     │
//!     └──> write_graph -> graph_data.json
//! ```

mod assembler;
mod dbscan;
mod error;
mod pca;
mod projection;
mod types;

pub use assembler::{read_graph, write_graph, GraphAssembler};
pub use dbscan::{cosine_distances, dbscan};
pub use error::{GraphError, Result};
pub use projection::{DensityProjector, ProjectionService, DEFAULT_EPS, DEFAULT_MIN_SAMPLES};
pub use types::{GraphNode, Position, Projection, NOISE_LABEL};
