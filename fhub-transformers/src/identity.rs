//! Pass-through stage.

use fhub_core::{Frame, FittedTransformer, GroupedTemporalContext, TransformError, Transformer};

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityTransformer;

impl Transformer for IdentityTransformer {
    fn describe(&self) -> String {
        "identity".into()
    }

    fn fit(
        &self,
        _input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Box<dyn FittedTransformer>, TransformError> {
        Ok(Box::new(*self))
    }
}

impl FittedTransformer for IdentityTransformer {
    fn transform(
        &self,
        input: &Frame,
        _ctx: &GroupedTemporalContext,
    ) -> Result<Frame, TransformError> {
        Ok(input.clone())
    }
}
