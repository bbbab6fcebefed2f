//! Error types for the fhub-core crate.
//!
//! Every variant of [`PipelineError`] is fatal to a pipeline run. Nothing is
//! retried and no partially assembled matrix is ever returned.

use thiserror::Error;

/// Top-level error type for feature pipeline operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A feature references an input column that is absent from the dataset.
    #[error("Schema error: feature '{feature}' references unknown column '{column}'")]
    Schema { feature: String, column: String },

    /// A contrib module identifier could not be resolved, or its contribution was malformed.
    #[error("Contrib load error for '{identifier}': {reason}")]
    ContribLoad { identifier: String, reason: String },

    /// Two features declare the same output identity.
    #[error("Duplicate feature '{name}' at positions {first} and {second}")]
    DuplicateFeature {
        name: String,
        first: usize,
        second: usize,
    },

    /// A chain stage failed while fitting or transforming.
    #[error("{}", format_transform(.feature, .stage, .stage_name, .group, .message))]
    Transform {
        feature: String,
        stage: usize,
        stage_name: String,
        group: Option<String>,
        message: String,
    },

    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),
}

fn format_transform(
    feature: &str,
    stage: &usize,
    stage_name: &str,
    group: &Option<String>,
    message: &str,
) -> String {
    match group {
        Some(group) => format!(
            "Transform error in feature '{feature}', stage {stage} ({stage_name}), group '{group}': {message}"
        ),
        None => format!(
            "Transform error in feature '{feature}', stage {stage} ({stage_name}): {message}"
        ),
    }
}

impl PipelineError {
    pub fn schema(feature: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema {
            feature: feature.into(),
            column: column.into(),
        }
    }

    pub fn contrib_load(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContribLoad {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_feature(msg: impl Into<String>) -> Self {
        Self::InvalidFeature(msg.into())
    }

    pub fn invalid_dataset(msg: impl Into<String>) -> Self {
        Self::InvalidDataset(msg.into())
    }

    /// Attach feature and stage identity to an error raised inside a transformer.
    pub fn transform(
        feature: impl Into<String>,
        stage: usize,
        stage_name: impl Into<String>,
        err: TransformError,
    ) -> Self {
        Self::Transform {
            feature: feature.into(),
            stage,
            stage_name: stage_name.into(),
            group: err.group,
            message: err.message,
        }
    }

    /// Identity of the feature this error is attributed to, if any.
    pub fn feature(&self) -> Option<&str> {
        match self {
            Self::Schema { feature, .. } | Self::Transform { feature, .. } => Some(feature),
            Self::DuplicateFeature { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Error raised by a single transformer while fitting or transforming.
///
/// Transformers do not know which feature or chain position they occupy; the
/// executor adds that context when converting into [`PipelineError`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransformError {
    pub message: String,
    pub group: Option<String>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            group: None,
        }
    }

    /// Raised while processing a single entity group.
    pub fn in_group(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            group: Some(group.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_carries_group() {
        let err = PipelineError::transform(
            "ndvi_se|lag_imputer",
            0,
            "lag_imputer(by=entity)",
            TransformError::in_group("sj", "boom"),
        );
        let text = err.to_string();
        assert!(text.contains("ndvi_se|lag_imputer"));
        assert!(text.contains("stage 0"));
        assert!(text.contains("group 'sj'"));
        assert!(text.contains("boom"));
        assert_eq!(err.feature(), Some("ndvi_se|lag_imputer"));
    }

    #[test]
    fn test_transform_error_without_group() {
        let err = PipelineError::transform("f", 2, "pca(2)", TransformError::new("all missing"));
        assert_eq!(
            err.to_string(),
            "Transform error in feature 'f', stage 2 (pca(2)): all missing"
        );
    }

    #[test]
    fn test_schema_error_message() {
        let err = PipelineError::schema("f", "missing_col");
        assert!(err.to_string().contains("missing_col"));
        assert_eq!(err.feature(), Some("f"));
    }
}
