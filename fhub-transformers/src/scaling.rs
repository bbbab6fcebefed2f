//! Standardization.

use crate::check_width;
use fhub_core::{Frame, FittedTransformer, GroupedTemporalContext, TransformError, Transformer};

/// Centers each column to zero mean and scales it to unit variance.
///
/// Statistics use the population standard deviation over observed values;
/// missing values pass through. A constant column is only centered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardScaler;

#[derive(Debug, Clone)]
struct FittedStandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Transformer for StandardScaler {
    fn describe(&self) -> String {
        "standard_scaler".into()
    }

    fn fit(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        let mut means = Vec::with_capacity(input.width());
        let mut scales = Vec::with_capacity(input.width());
        for col in input.columns() {
            let mean = crate::observed_mean(&col.values).ok_or_else(|| {
                TransformError::new(format!(
                    "cannot scale column '{}': no observed values",
                    col.name
                ))
            })?;
            let (sum_sq, n) = col
                .values
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(acc, n), x| (acc + (x - mean).powi(2), n + 1));
            let std = (sum_sq / n as f64).sqrt();
            means.push(mean);
            scales.push(if std > f64::EPSILON { std } else { 1.0 });
        }
        Ok(Box::new(FittedStandardScaler { means, scales }))
    }
}

impl FittedTransformer for FittedStandardScaler {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        check_width(self.means.len(), input)?;
        input.map_columns(|i, col| {
            let (mean, scale) = (self.means[i], self.scales[i]);
            Ok(col.values.iter().map(|v| v.map(|x| (x - mean) / scale)).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, frame};
    use fhub_core::RowKey;

    #[test]
    fn test_standardizes_observed_values() {
        let input = frame(
            "x",
            vec![
                (RowKey::new("A", 1), Some(1.0)),
                (RowKey::new("A", 2), Some(3.0)),
                (RowKey::new("A", 3), None),
            ],
        );
        let ctx = context(&input);
        let out = StandardScaler
            .fit(&input, &ctx)
            .unwrap()
            .transform(&input, &ctx)
            .unwrap();
        assert_eq!(out.columns()[0].values, vec![Some(-1.0), Some(1.0), None]);
    }

    #[test]
    fn test_constant_column_is_centered_only() {
        let input = frame(
            "x",
            vec![(RowKey::new("A", 1), Some(4.0)), (RowKey::new("A", 2), Some(4.0))],
        );
        let ctx = context(&input);
        let out = StandardScaler
            .fit(&input, &ctx)
            .unwrap()
            .transform(&input, &ctx)
            .unwrap();
        assert_eq!(out.columns()[0].values, vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_all_missing_column_fails() {
        let input = frame("x", vec![(RowKey::new("A", 1), None)]);
        assert!(StandardScaler.fit(&input, &context(&input)).is_err());
    }
}
