//! Feature definitions: input columns bound to an ordered transform chain.

use crate::error::PipelineError;
use crate::transformer::Transformer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Separator between input names in a derived feature identity.
const INPUT_SEPARATOR: &str = "+";
/// Separator between stage descriptions in a derived feature identity.
const STAGE_SEPARATOR: &str = ">";

/// A feature: one or more input columns run through a non-empty chain of stages.
///
/// Features are pure declarations. Fitting never mutates them; each run
/// creates fresh fitted state from the chain's stages.
#[derive(Debug, Clone)]
pub struct Feature {
    inputs: Vec<String>,
    chain: Vec<Arc<dyn Transformer>>,
    name: Option<String>,
    description: Option<String>,
}

impl Feature {
    /// Bind `inputs` to `chain`.
    ///
    /// Input names are only checked against a dataset when the pipeline runs.
    pub fn new<I, S>(inputs: I, chain: Vec<Box<dyn Transformer>>) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            return Err(PipelineError::invalid_feature(
                "a feature needs at least one input column",
            ));
        }
        if let Some(blank) = inputs.iter().find(|i| i.trim().is_empty()) {
            return Err(PipelineError::invalid_feature(format!(
                "blank input column name '{blank}'"
            )));
        }
        if chain.is_empty() {
            return Err(PipelineError::invalid_feature(format!(
                "feature over [{}] has an empty transformer chain",
                inputs.join(", ")
            )));
        }
        Ok(Self {
            inputs,
            chain: chain.into_iter().map(Arc::from).collect(),
            name: None,
            description: None,
        })
    }

    /// Single-input convenience constructor.
    pub fn single(
        input: impl Into<String>,
        chain: Vec<Box<dyn Transformer>>,
    ) -> Result<Self, PipelineError> {
        Self::new([input.into()], chain)
    }

    /// Give the feature an explicit output identity instead of the derived one.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn chain(&self) -> &[Arc<dyn Transformer>] {
        &self.chain
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Stage descriptions in chain order.
    pub fn stage_names(&self) -> Vec<String> {
        self.chain.iter().map(|t| t.describe()).collect()
    }

    /// The feature's declared output identity.
    ///
    /// Explicit name if set, otherwise `inputs|stages`, e.g.
    /// `ndvi_se|lag_imputer(by=entity)>mean_imputer>standard_scaler`.
    pub fn identity(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        format!(
            "{}|{}",
            self.inputs.join(INPUT_SEPARATOR),
            self.stage_names().join(STAGE_SEPARATOR)
        )
    }

    /// Output column names for a final stage emitting `width` columns.
    pub fn output_names(&self, width: usize) -> Vec<String> {
        let identity = self.identity();
        if width == 1 {
            vec![identity]
        } else {
            (0..width).map(|i| format!("{identity}_{i}")).collect()
        }
    }

    /// Width of the final stage's output, folded from the input count
    /// through each stage's [`Transformer::output_width`].
    pub fn output_width(&self) -> usize {
        self.chain
            .iter()
            .fold(self.inputs.len(), |width, stage| stage.output_width(width))
    }

    /// Output column names this feature will contribute to the matrix.
    pub fn planned_output_names(&self) -> Vec<String> {
        self.output_names(self.output_width())
    }

    /// Whether any stage in the chain works per entity.
    pub fn is_group_aware(&self) -> bool {
        self.chain.iter().any(|t| t.is_group_aware())
    }

    /// Serializable summary of this feature.
    pub fn describe(&self) -> FeatureDescription {
        FeatureDescription {
            identity: self.identity(),
            inputs: self.inputs.clone(),
            stages: self.stage_names(),
            outputs: self.planned_output_names(),
            group_aware: self.is_group_aware(),
            description: self.description.clone(),
        }
    }
}

/// Plain-data view of a feature, for plan listings and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescription {
    pub identity: String,
    pub inputs: Vec<String>,
    pub stages: Vec<String>,
    /// Planned output column names.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// True if at least one stage fits and transforms per entity.
    #[serde(default)]
    pub group_aware: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
