//! Contributed feature modules.
//!
//! Built-in modules are compiled in and keyed by identifier. Any other
//! identifier is looked up as a TOML manifest when a manifest directory is
//! configured.

use crate::config::{DEFAULT_CONTRIB_MODULE, DengueConfig};
use fhub_core::{ContribLoader, Feature, PipelineError, StaticContribLoader, Transformer};
use fhub_transformers::{LagImputer, ManifestContribLoader, MeanImputer, StandardScaler};

/// Northern vegetation indices, cleaned the same way as the southern ones.
fn vegetation_north() -> Result<Vec<Feature>, PipelineError> {
    ["ndvi_ne", "ndvi_nw"]
        .into_iter()
        .map(|input| {
            Feature::single(
                input,
                vec![
                    Box::new(LagImputer::by_entity()) as Box<dyn Transformer>,
                    Box::new(MeanImputer),
                    Box::new(StandardScaler),
                ],
            )
        })
        .collect()
}

/// Modules compiled into this crate.
pub fn builtin_modules() -> StaticContribLoader {
    StaticContribLoader::new().with(DEFAULT_CONTRIB_MODULE, vegetation_north)
}

/// Built-in modules first, then manifests on disk.
#[derive(Debug, Clone)]
pub struct DengueContribLoader {
    builtin: StaticContribLoader,
    manifests: Option<ManifestContribLoader>,
}

impl DengueContribLoader {
    pub fn new(builtin: StaticContribLoader, manifests: Option<ManifestContribLoader>) -> Self {
        Self { builtin, manifests }
    }

    pub fn from_config(config: &DengueConfig) -> Self {
        Self::new(
            builtin_modules(),
            config
                .contrib
                .manifest_dir
                .as_ref()
                .map(ManifestContribLoader::new),
        )
    }

    fn is_builtin(&self, identifier: &str) -> bool {
        self.builtin.identifiers().contains(&identifier)
    }
}

impl ContribLoader for DengueContribLoader {
    fn resolve(&self, identifier: &str) -> Result<Vec<Feature>, PipelineError> {
        match &self.manifests {
            Some(manifests) if !self.is_builtin(identifier) => manifests.resolve(identifier),
            _ => self.builtin.resolve(identifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_module_resolves() {
        let features = builtin_modules().resolve(DEFAULT_CONTRIB_MODULE).unwrap();
        let ids: Vec<_> = features.iter().map(Feature::identity).collect();
        assert_eq!(
            ids,
            vec![
                "ndvi_ne|lag_imputer(by=entity)>mean_imputer>standard_scaler",
                "ndvi_nw|lag_imputer(by=entity)>mean_imputer>standard_scaler",
            ]
        );
    }

    #[test]
    fn test_unknown_module_without_manifests_fails() {
        let loader = DengueContribLoader::from_config(&DengueConfig::default());
        assert!(matches!(
            loader.resolve("somewhere.else"),
            Err(PipelineError::ContribLoad { .. })
        ));
    }

    #[test]
    fn test_manifest_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extras.toml"),
            "[[feature]]\ninput = \"station_precip_mm\"\nstages = [{ type = \"null_indicator\" }]\n",
        )
        .unwrap();
        let mut config = DengueConfig::default();
        config.contrib.manifest_dir = Some(dir.path().to_path_buf());
        let loader = DengueContribLoader::from_config(&config);

        let extras = loader.resolve("extras").unwrap();
        assert_eq!(extras[0].identity(), "station_precip_mm|null_indicator");
        // Built-ins still win over the manifest directory.
        assert_eq!(loader.resolve(DEFAULT_CONTRIB_MODULE).unwrap().len(), 2);
    }
}
