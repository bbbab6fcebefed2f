//! Principal component analysis over all of a feature's inputs at once.

use crate::check_width;
use fhub_core::{
    Column, Frame, FittedTransformer, GroupedTemporalContext, TransformError, Transformer,
};
use nalgebra::DMatrix;

/// Projects the input columns onto their leading principal components.
///
/// Consumes every input column jointly and emits `n_components` columns.
/// Inputs must be free of missing values; impute earlier in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pca {
    n_components: usize,
}

impl Pca {
    pub fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}

#[derive(Debug, Clone)]
struct FittedPca {
    mean: Vec<f64>,
    /// One unit-length row per component, ordered by explained variance.
    components: Vec<Vec<f64>>,
    explained_variance: Vec<f64>,
}

impl Transformer for Pca {
    fn describe(&self) -> String {
        format!("pca({})", self.n_components)
    }

    fn output_width(&self, _input_width: usize) -> usize {
        self.n_components
    }

    fn fit(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        let n_features = input.width();
        if self.n_components == 0 {
            return Err(TransformError::new("n_components must be at least 1"));
        }
        if self.n_components > n_features {
            return Err(TransformError::new(format!(
                "n_components={} exceeds the {} input columns",
                self.n_components, n_features
            )));
        }
        if input.is_empty() {
            return Err(TransformError::new("cannot fit PCA on zero rows"));
        }

        let data = dense_matrix(input)?;
        let n_rows = data.nrows();
        let mean: Vec<f64> = (0..n_features).map(|c| data.column(c).mean()).collect();

        let mut centered = data;
        for (c, m) in mean.iter().enumerate() {
            centered.column_mut(c).add_scalar_mut(-m);
        }
        let denom = n_rows.saturating_sub(1).max(1) as f64;
        let covariance = (centered.transpose() * &centered) / denom;

        let eigen = covariance.symmetric_eigen();
        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let components = order
            .iter()
            .take(self.n_components)
            .map(|&k| {
                let mut axis: Vec<f64> = eigen.eigenvectors.column(k).iter().copied().collect();
                flip_sign(&mut axis);
                axis
            })
            .collect();
        let explained_variance = order
            .iter()
            .take(self.n_components)
            .map(|&k| eigen.eigenvalues[k].max(0.0))
            .collect();

        Ok(Box::new(FittedPca {
            mean,
            components,
            explained_variance,
        }))
    }
}

impl FittedTransformer for FittedPca {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        check_width(self.mean.len(), input)?;
        let data = dense_matrix(input)?;

        let columns = self
            .components
            .iter()
            .enumerate()
            .map(|(k, axis)| {
                let values = data
                    .row_iter()
                    .map(|row| {
                        Some(
                            row.iter()
                                .zip(&self.mean)
                                .zip(axis)
                                .map(|((x, m), w)| (x - m) * w)
                                .sum::<f64>(),
                        )
                    })
                    .collect();
                Column::new(format!("pc{k}"), values)
            })
            .collect();
        tracing::trace!(
            components = self.components.len(),
            variance = ?self.explained_variance,
            "Projected onto principal components"
        );
        input.with_columns(columns)
    }
}

/// Copy a frame into a dense row-major matrix, rejecting missing and
/// non-finite values.
fn dense_matrix(input: &Frame) -> Result<DMatrix<f64>, TransformError> {
    let missing: usize = input.columns().iter().map(Column::missing_count).sum();
    if missing > 0 {
        return Err(TransformError::new(format!(
            "input contains {missing} missing values; impute before decomposition"
        )));
    }
    let columns = input.columns();
    for col in columns {
        if let Some(row) = col.values.iter().position(|v| v.is_some_and(|x| !x.is_finite())) {
            return Err(TransformError::new(format!(
                "column '{}' has a non-finite value at {}",
                col.name,
                input.index()[row]
            )));
        }
    }
    Ok(DMatrix::from_fn(input.len(), columns.len(), |r, c| {
        columns[c].values[r].unwrap_or_default()
    }))
}

/// Make the largest-magnitude loading positive so output signs are deterministic.
fn flip_sign(axis: &mut [f64]) {
    let dominant = axis
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if dominant < 0.0 {
        axis.iter_mut().for_each(|w| *w = -*w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use fhub_core::{Dataset, RowKey};

    fn correlated(rows: usize) -> Frame {
        let ds = Dataset::from_rows(
            &["a", "b", "c"],
            (0..rows).map(|i| {
                let t = i as f64;
                (
                    RowKey::new("A", i as i64),
                    vec![Some(t), Some(2.0 * t + 1.0), Some(-t + 0.5 * (t % 2.0))],
                )
            }),
        )
        .unwrap();
        ds.select(&["a", "b", "c"]).unwrap()
    }

    #[test]
    fn test_emits_requested_component_count() {
        for rows in [1, 2, 5, 40] {
            let input = correlated(rows);
            let ctx = context(&input);
            let out = Pca::new(2)
                .fit(&input, &ctx)
                .unwrap()
                .transform(&input, &ctx)
                .unwrap();
            assert_eq!(out.width(), 2, "rows = {rows}");
            assert_eq!(out.len(), rows);
            assert_eq!(out.column_names(), vec!["pc0", "pc1"]);
        }
    }

    #[test]
    fn test_first_component_captures_most_variance() {
        let input = correlated(20);
        let ctx = context(&input);
        let fitted = Pca::new(2).fit(&input, &ctx).unwrap();
        let out = fitted.transform(&input, &ctx).unwrap();

        let variance = |col: &Column| {
            let vals: Vec<f64> = col.values.iter().flatten().copied().collect();
            let mean = vals.iter().sum::<f64>() / vals.len() as f64;
            vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        };
        assert!(variance(&out.columns()[0]) >= variance(&out.columns()[1]));
    }

    #[test]
    fn test_missing_input_rejected() {
        let ds = Dataset::from_rows(
            &["a", "b"],
            vec![
                (RowKey::new("A", 1), vec![None, Some(1.0)]),
                (RowKey::new("A", 2), vec![None, Some(2.0)]),
            ],
        )
        .unwrap();
        let input = ds.select(&["a", "b"]).unwrap();
        let err = Pca::new(1).fit(&input, &context(&input)).unwrap_err();
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let clean = correlated(4);
        let ctx = context(&clean);
        let fitted = Pca::new(2).fit(&clean, &ctx).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut columns = clean.columns().to_vec();
            columns[1].values[2] = Some(bad);
            let input = clean.with_columns(columns).unwrap();

            let err = Pca::new(2).fit(&input, &ctx).unwrap_err();
            assert!(err.message.contains("non-finite"), "{}", err.message);
            assert!(err.message.contains("'b'"), "{}", err.message);
            assert!(fitted.transform(&input, &ctx).is_err());
        }
    }

    #[test]
    fn test_output_width_is_component_count() {
        assert_eq!(Pca::new(2).output_width(6), 2);
        assert_eq!(Pca::new(3).output_width(3), 3);
    }

    #[test]
    fn test_too_many_components_rejected() {
        let input = correlated(5);
        assert!(Pca::new(4).fit(&input, &context(&input)).is_err());
        assert!(Pca::new(0).fit(&input, &context(&input)).is_err());
    }

    #[test]
    fn test_flip_sign() {
        let mut axis = vec![0.1, -0.9, 0.2];
        flip_sign(&mut axis);
        assert_eq!(axis, vec![-0.1, 0.9, -0.2]);
    }
}
