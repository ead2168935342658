use ndarray::{Array1, Array2, ArrayView2, Axis};

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f32 = 1e-7;

/// Project the rows of `data` onto their top principal components.
///
/// Components come from power iteration on the covariance, orthogonalized against earlier
/// ones. Each component's sign is fixed so its largest coordinate is positive. Components
/// with no remaining variance project to 0.
#[must_use]
pub fn project(data: ArrayView2<'_, f32>, components: usize) -> Array2<f32> {
    let (rows, cols) = data.dim();
    let mut out = Array2::<f32>::zeros((rows, components));
    if rows == 0 || cols == 0 {
        return out;
    }

    let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols));
    let centered = &data - &mean;

    // Eigenvalues below this share of the total variance count as zero.
    let floor = centered.iter().map(|v| v * v).sum::<f32>() * 1e-4;
    let mut basis: Vec<Array1<f32>> = Vec::with_capacity(components);
    for component in 0..components {
        let Some(axis) = principal_axis(&centered, &basis, component, floor) else {
            break;
        };
        out.column_mut(component).assign(&centered.dot(&axis));
        basis.push(axis);
    }
    out
}

fn principal_axis(
    centered: &Array2<f32>,
    basis: &[Array1<f32>],
    component: usize,
    floor: f32,
) -> Option<Array1<f32>> {
    let cols = centered.ncols();
    let mut axis = Array1::from_shape_fn(cols, |idx| seed_value(idx, component));
    orthogonalize(&mut axis, basis);
    unit(&mut axis)?;

    for _ in 0..MAX_ITERATIONS {
        let mut next = centered.t().dot(&centered.dot(&axis));
        orthogonalize(&mut next, basis);
        if next.dot(&next).sqrt() <= floor {
            return None;
        }
        unit(&mut next)?;
        let converged = 1.0 - next.dot(&axis).abs() < TOLERANCE;
        axis = next;
        if converged {
            break;
        }
    }

    let pivot = axis
        .iter()
        .copied()
        .fold(0.0f32, |best, v| if v.abs() > best.abs() { v } else { best });
    if pivot < 0.0 {
        axis.mapv_inplace(|v| -v);
    }
    Some(axis)
}

/// Deterministic start vector, distinct per component.
fn seed_value(idx: usize, component: usize) -> f32 {
    let phase = (idx as f32).mul_add(0.618_034, component as f32 * 0.414_214);
    1.0 + phase.fract()
}

fn orthogonalize(vector: &mut Array1<f32>, basis: &[Array1<f32>]) {
    for axis in basis {
        let overlap = vector.dot(axis);
        vector.scaled_add(-overlap, axis);
    }
}

/// Scale to unit length; `None` when the vector has vanished.
fn unit(vector: &mut Array1<f32>) -> Option<()> {
    let norm = vector.dot(&*vector).sqrt();
    if norm <= 1e-6 {
        return None;
    }
    vector.mapv_inplace(|v| v / norm);
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn points_on_a_line_use_one_axis() {
        let data = array![[0.0f32, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.0, 0.0], [3.0, 3.0, 0.0]];
        let projected = project(data.view(), 3);
        assert_eq!(projected.dim(), (4, 3));

        let step = std::f32::consts::SQRT_2;
        for (idx, row) in projected.outer_iter().enumerate() {
            let expected = (idx as f32 - 1.5) * step;
            assert!((row[0] - expected).abs() < 1e-3, "row {idx}: {row}");
            assert!(row[1].abs() < 1e-3);
            assert!(row[2].abs() < 1e-3);
        }
    }

    #[test]
    fn first_axis_carries_most_variance() {
        let data = array![
            [10.0f32, 0.0, 1.0],
            [-10.0, 0.0, -1.0],
            [0.0, 3.0, 0.0],
            [0.0, -3.0, 0.0],
        ];
        let projected = project(data.view(), 3);
        let variance = |col: usize| projected.column(col).mapv(|v| v * v).sum();
        assert!(variance(0) > variance(1));
        assert!(variance(1) >= variance(2));
    }

    #[test]
    fn degenerate_inputs_project_to_origin() {
        let single = array![[0.3f32, 0.4, 0.5]];
        assert_eq!(project(single.view(), 3), Array2::<f32>::zeros((1, 3)));

        let empty = Array2::<f32>::zeros((0, 4));
        assert_eq!(project(empty.view(), 3).dim(), (0, 3));
    }

    #[test]
    fn projection_is_deterministic() {
        let data = array![[0.1f32, 0.9, 0.3], [0.8, 0.2, 0.5], [0.4, 0.4, 0.9], [0.7, 0.1, 0.0]];
        assert_eq!(project(data.view(), 3), project(data.view(), 3));
    }
}
