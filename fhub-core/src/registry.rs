//! Feature registry: ordered static features plus merged contrib features.

use crate::contrib::{CONTRIB_MODULE_KEY, CONTRIB_SECTION, ConfigLookup, ContribLoader};
use crate::error::PipelineError;
use crate::feature::{Feature, FeatureDescription};
use std::collections::HashMap;

/// Ordered collection of features under construction.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: Vec<Feature>,
    static_count: usize,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append statically declared features in call order.
    pub fn register<I>(&mut self, features: I)
    where
        I: IntoIterator<Item = Feature>,
    {
        let before = self.features.len();
        self.features.extend(features);
        self.static_count += self.features.len() - before;
    }

    /// Append a single statically declared feature.
    pub fn push(&mut self, feature: Feature) {
        self.register([feature]);
    }

    /// Resolve `identifier` through `loader` and append the contributed
    /// features after everything registered so far, in loader order.
    ///
    /// Returns the number of features merged.
    pub fn merge_contrib(
        &mut self,
        loader: &dyn ContribLoader,
        identifier: &str,
    ) -> Result<usize, PipelineError> {
        let contributed = loader.resolve(identifier)?;
        let count = contributed.len();
        tracing::info!(identifier, count, "Merged contrib features");
        self.features.extend(contributed);
        Ok(count)
    }

    /// Look up the contrib module identifier in `config` and merge it.
    pub fn merge_contrib_from_config(
        &mut self,
        loader: &dyn ContribLoader,
        config: &dyn ConfigLookup,
    ) -> Result<usize, PipelineError> {
        let identifier = config
            .lookup(CONTRIB_SECTION, CONTRIB_MODULE_KEY)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::contrib_load(
                    format!("{CONTRIB_SECTION}.{CONTRIB_MODULE_KEY}"),
                    "contrib module identifier is not configured",
                )
            })?;
        self.merge_contrib(loader, &identifier)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of features registered statically (before any contrib merge).
    pub fn static_count(&self) -> usize {
        self.static_count
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Check output names and freeze the registry into an executable plan.
    ///
    /// Every feature claims its identity and each of its planned output
    /// column names (`identity_0`, ... for multi-column outputs); any name
    /// claimed twice is a [`PipelineError::DuplicateFeature`].
    pub fn finalize(self) -> Result<FeaturePlan, PipelineError> {
        let mut claimed: HashMap<String, usize> = HashMap::with_capacity(self.features.len());
        for (position, feature) in self.features.iter().enumerate() {
            let mut names = feature.planned_output_names();
            let identity = feature.identity();
            if !names.contains(&identity) {
                names.insert(0, identity);
            }
            for name in names {
                if let Some(&first) = claimed.get(&name) {
                    return Err(PipelineError::DuplicateFeature {
                        name,
                        first,
                        second: position,
                    });
                }
                claimed.insert(name, position);
            }
        }
        tracing::debug!(
            features = self.features.len(),
            contrib = self.features.len() - self.static_count,
            "Finalized feature plan"
        );
        Ok(FeaturePlan {
            features: self.features,
            static_count: self.static_count,
        })
    }
}

/// A finalized, collision-free feature list. Only plans can be executed.
#[derive(Debug, Clone)]
pub struct FeaturePlan {
    features: Vec<Feature>,
    static_count: usize,
}

impl FeaturePlan {
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn static_count(&self) -> usize {
        self.static_count
    }

    pub fn contrib_count(&self) -> usize {
        self.features.len() - self.static_count
    }

    /// Output identities in plan order.
    pub fn identities(&self) -> Vec<String> {
        self.features.iter().map(Feature::identity).collect()
    }

    pub fn describe(&self) -> Vec<FeatureDescription> {
        self.features.iter().map(Feature::describe).collect()
    }
}
