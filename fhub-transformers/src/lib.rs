//! # fhub-transformers
//!
//! Chain stages for fhub feature pipelines. Group-aware stages
//! ([`LagImputer`], [`SingleLagger`]) work independently within each entity's
//! time-ordered series; the rest operate column-wise over all rows.
//!
//! | Stage | State learned at fit time |
//! |-------|---------------------------|
//! | [`IdentityTransformer`] | none |
//! | [`log1p`] / [`simple_function`] | none |
//! | [`LagImputer`] | last observation per entity |
//! | [`SingleLagger`] | trailing `lag` values per entity |
//! | [`MeanImputer`] | column means |
//! | [`NullFiller`] | none |
//! | [`NullIndicator`] | none |
//! | [`StandardScaler`] | column mean and standard deviation |
//! | [`Pca`] | input mean and principal axes |

pub mod decomposition;
pub mod function;
pub mod identity;
pub mod manifest;
pub mod missing;
pub mod scaling;
pub mod spec;
pub mod ts;

pub use decomposition::Pca;
pub use function::{NamedFunction, log1p, simple_function};
pub use identity::IdentityTransformer;
pub use manifest::ManifestContribLoader;
pub use missing::{LagImputer, MeanImputer, NullFiller, NullIndicator};
pub use scaling::StandardScaler;
pub use spec::{FeatureManifest, FeatureSpec, InputSpec, StageSpec};
pub use ts::SingleLagger;

use fhub_core::{Frame, TransformError};

/// Fitted stages must see the same number of columns they were fitted on.
pub(crate) fn check_width(expected: usize, input: &Frame) -> Result<(), TransformError> {
    if input.width() != expected {
        return Err(TransformError::new(format!(
            "fitted on {expected} columns but received {}",
            input.width()
        )));
    }
    Ok(())
}

/// Mean of the observed (non-missing) values, `None` if there are none.
pub(crate) fn observed_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_mean() {
        assert_eq!(observed_mean(&[Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(observed_mean(&[None, None]), None);
        assert_eq!(observed_mean(&[]), None);
    }
}
