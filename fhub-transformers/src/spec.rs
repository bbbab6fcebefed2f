//! Declarative stage and feature specs.
//!
//! Lets features be declared as data (e.g. in a contrib manifest) instead of
//! code:
//!
//! ```toml
//! [[feature]]
//! input = "station_precip_mm"
//! stages = [
//!     { type = "lag_imputer", group_by = "entity" },
//!     { type = "null_filler", replacement = 0.0 },
//!     { type = "function", function = "log1p" },
//! ]
//! ```

use crate::decomposition::Pca;
use crate::function::{NamedFunction, simple_function};
use crate::identity::IdentityTransformer;
use crate::missing::{LagImputer, MeanImputer, NullFiller, NullIndicator};
use crate::scaling::StandardScaler;
use crate::ts::SingleLagger;
use fhub_core::{Feature, GroupBy, PipelineError, Transformer};
use serde::{Deserialize, Serialize};

/// One chain stage, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageSpec {
    Identity,
    Function {
        function: NamedFunction,
    },
    LagImputer {
        #[serde(default)]
        group_by: GroupBy,
    },
    SingleLagger {
        lag: usize,
        #[serde(default)]
        group_by: GroupBy,
    },
    MeanImputer,
    NullFiller {
        #[serde(default)]
        replacement: f64,
    },
    NullIndicator,
    StandardScaler,
    Pca {
        n_components: usize,
    },
}

impl StageSpec {
    /// Instantiate the unfitted stage.
    pub fn build(&self) -> Result<Box<dyn Transformer>, PipelineError> {
        let stage: Box<dyn Transformer> = match *self {
            Self::Identity => Box::new(IdentityTransformer),
            Self::Function { function } => Box::new(simple_function(function)),
            Self::LagImputer { group_by } => Box::new(LagImputer::new(group_by)),
            Self::SingleLagger { lag, group_by } => Box::new(SingleLagger::new(lag, group_by)),
            Self::MeanImputer => Box::new(MeanImputer),
            Self::NullFiller { replacement } => {
                if !replacement.is_finite() {
                    return Err(PipelineError::invalid_feature(format!(
                        "null_filler replacement must be finite, got {replacement}"
                    )));
                }
                Box::new(NullFiller::new(replacement))
            }
            Self::NullIndicator => Box::new(NullIndicator),
            Self::StandardScaler => Box::new(StandardScaler),
            Self::Pca { n_components } => {
                if n_components == 0 {
                    return Err(PipelineError::invalid_feature(
                        "pca n_components must be at least 1",
                    ));
                }
                Box::new(Pca::new(n_components))
            }
        };
        Ok(stage)
    }
}

/// One input column or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputSpec {
    One(String),
    Many(Vec<String>),
}

impl InputSpec {
    pub fn columns(&self) -> Vec<String> {
        match self {
            Self::One(c) => vec![c.clone()],
            Self::Many(cs) => cs.clone(),
        }
    }
}

/// A feature declared as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub input: InputSpec,
    pub stages: Vec<StageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FeatureSpec {
    pub fn build(&self) -> Result<Feature, PipelineError> {
        let chain = self
            .stages
            .iter()
            .map(StageSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        let mut feature = Feature::new(self.input.columns(), chain)?;
        if let Some(name) = &self.name {
            feature = feature.named(name.clone());
        }
        if let Some(description) = &self.description {
            feature = feature.with_description(description.clone());
        }
        Ok(feature)
    }
}

/// A list of feature specs, as stored in a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    #[serde(rename = "feature", default)]
    pub features: Vec<FeatureSpec>,
}

impl FeatureManifest {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Build every feature, reporting the position of the first bad entry.
    pub fn build(&self) -> Result<Vec<Feature>, PipelineError> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                spec.build()
                    .map_err(|e| PipelineError::invalid_feature(format!("feature #{i}: {e}")))
            })
            .collect()
    }
}
