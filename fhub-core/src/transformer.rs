//! The two-phase transformer capability.
//!
//! A [`Transformer`] is an unfitted stage carrying only hyperparameters. Its
//! [`fit`](Transformer::fit) learns from a frame and returns a fresh
//! [`FittedTransformer`] owning all learned state; the unfitted stage is never
//! mutated, so one feature declaration can be fitted any number of times
//! without state leaking between runs.

use crate::context::GroupedTemporalContext;
use crate::dataset::Frame;
use crate::error::TransformError;
use std::fmt;
use std::sync::Arc;

/// An unfitted chain stage.
pub trait Transformer: fmt::Debug + Send + Sync {
    /// Short, stable description including hyperparameters, e.g. `single_lagger(1)`.
    ///
    /// Used to derive feature identities and to label errors.
    fn describe(&self) -> String;

    /// Learn parameters from `input`.
    fn fit(
        &self,
        input: &Frame,
        ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError>;

    /// Whether this stage partitions its work by entity.
    fn is_group_aware(&self) -> bool {
        false
    }

    /// Number of columns this stage emits when fed `input_width` columns.
    ///
    /// Registries use it to derive output names before anything is fitted;
    /// the executor rejects a stage whose output disagrees with it.
    fn output_width(&self, input_width: usize) -> usize {
        input_width
    }
}

/// A fitted chain stage holding its learned state.
pub trait FittedTransformer: fmt::Debug + Send + Sync {
    /// Produce new columns from `input`. The input frame is never modified.
    fn transform(
        &self,
        input: &Frame,
        ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError>;
}

/// Stateless column function applied value by value.
pub type ValueFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Wraps a pure per-value function into the fit/transform contract.
///
/// Missing values pass through untouched.
#[derive(Clone)]
pub struct FunctionTransformer {
    name: String,
    func: ValueFn,
}

impl FunctionTransformer {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FunctionTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTransformer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Transformer for FunctionTransformer {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn fit(
        &self,
        _input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        Ok(Box::new(self.clone()))
    }
}

impl FittedTransformer for FunctionTransformer {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        input.map_columns(|_, col| {
            Ok(col.values.iter().map(|v| v.map(|x| (self.func)(x))).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, RowKey};

    #[test]
    fn test_function_transformer_skips_missing() {
        let ds = Dataset::from_rows(
            &["x"],
            vec![
                (RowKey::new("a", 1), vec![Some(2.0)]),
                (RowKey::new("a", 2), vec![None]),
            ],
        )
        .unwrap();
        let frame = ds.select(&["x"]).unwrap();
        let ctx = GroupedTemporalContext::from_index(frame.index().to_vec().into());

        let double = FunctionTransformer::new("double", |x| x * 2.0);
        assert_eq!(double.describe(), "double");
        let fitted = double.fit(&frame, &ctx).unwrap();
        let out = fitted.transform(&frame, &ctx).unwrap();
        assert_eq!(out.columns()[0].values, vec![Some(4.0), None]);
        assert_eq!(out.columns()[0].name, "x");
    }
}
