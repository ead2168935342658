use crate::types::NOISE_LABEL;
use ndarray::{Array2, ArrayView2, Axis};
use std::collections::VecDeque;

/// Pairwise cosine distances (`1 - cos`) between the rows of `data`.
///
/// Zero rows are at distance 1 from everything but themselves.
#[must_use]
pub fn cosine_distances(data: ArrayView2<'_, f32>) -> Array2<f32> {
    let mut normalized = data.to_owned();
    for mut row in normalized.axis_iter_mut(Axis(0)) {
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }

    let mut distances = normalized.dot(&normalized.t());
    distances.mapv_inplace(|similarity| (1.0 - similarity).clamp(0.0, 2.0));
    for idx in 0..distances.nrows() {
        distances[[idx, idx]] = 0.0;
    }
    distances
}

/// DBSCAN over a precomputed distance matrix.
///
/// A point is core when at least `min_samples` points (itself included) lie within `eps`.
/// Clusters are numbered from 0 in order of their first core point; everything else is
/// [`NOISE_LABEL`].
#[must_use]
pub fn dbscan(distances: ArrayView2<'_, f32>, eps: f32, min_samples: usize) -> Vec<i32> {
    let n = distances.nrows();
    let neighborhoods: Vec<Vec<usize>> = distances
        .outer_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|&(_, &d)| d <= eps)
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect();
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|neighbors| neighbors.len() >= min_samples)
        .collect();

    let mut labels = vec![NOISE_LABEL; n];
    let mut next_label = 0;
    let mut queue = VecDeque::new();

    for start in 0..n {
        if labels[start] != NOISE_LABEL || !is_core[start] {
            continue;
        }
        labels[start] = next_label;
        queue.push_back(start);
        while let Some(point) = queue.pop_front() {
            if !is_core[point] {
                continue;
            }
            for &neighbor in &neighborhoods[point] {
                if labels[neighbor] == NOISE_LABEL {
                    labels[neighbor] = next_label;
                    queue.push_back(neighbor);
                }
            }
        }
        next_label += 1;
    }

    labels
}
