use crate::dbscan::{cosine_distances, dbscan};
use crate::error::{GraphError, Result};
use crate::pca;
use crate::types::Projection;
use ndarray::Array2;

pub const DEFAULT_EPS: f32 = 0.3;
pub const DEFAULT_MIN_SAMPLES: usize = 2;

/// Maps embedding vectors to 3-D positions and cluster labels, index-aligned with the input
pub trait ProjectionService: Send + Sync {
    fn project_and_cluster(&self, vectors: &[Vec<f32>]) -> Result<Projection>;
}

/// DBSCAN on cosine distance for labels, PCA for positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityProjector {
    eps: f32,
    min_samples: usize,
}

impl Default for DensityProjector {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl DensityProjector {
    pub fn new(eps: f32, min_samples: usize) -> Result<Self> {
        if !(eps.is_finite() && eps > 0.0) {
            return Err(GraphError::InvalidInput(format!(
                "eps must be a positive number, got {eps}"
            )));
        }
        if min_samples == 0 {
            return Err(GraphError::InvalidInput("min_samples must be > 0".into()));
        }
        Ok(Self { eps, min_samples })
    }

    #[must_use]
    pub const fn eps(&self) -> f32 {
        self.eps
    }

    #[must_use]
    pub const fn min_samples(&self) -> usize {
        self.min_samples
    }
}

impl ProjectionService for DensityProjector {
    fn project_and_cluster(&self, vectors: &[Vec<f32>]) -> Result<Projection> {
        let Some(first) = vectors.first() else {
            return Ok(Projection::default());
        };
        let dimension = first.len();
        if let Some((idx, bad)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != dimension)
        {
            return Err(GraphError::InvalidInput(format!(
                "vector {idx} has dimension {}, expected {dimension}",
                bad.len()
            )));
        }

        let flat: Vec<f32> = vectors.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((vectors.len(), dimension), flat)
            .map_err(|e| GraphError::ProjectionError(format!("Vector shape error: {e}")))?;

        let labels = dbscan(cosine_distances(data.view()).view(), self.eps, self.min_samples);
        let coords = pca::project(data.view(), 3);
        let positions = coords
            .outer_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();

        let projection = Projection { positions, labels };
        log::info!(
            "Projected {} vectors into {} clusters (eps {}, min_samples {})",
            projection.len(),
            projection.cluster_count(),
            self.eps,
            self.min_samples
        );
        Ok(projection)
    }
}
