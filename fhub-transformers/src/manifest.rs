//! Contrib loader backed by TOML feature manifests on disk.

use crate::spec::FeatureManifest;
use fhub_core::{ContribLoader, Feature, PipelineError};
use std::path::{Path, PathBuf};

const MANIFEST_EXTENSION: &str = "toml";

/// Resolves a module identifier to `<base_dir>/<identifier>.toml`.
///
/// Identifiers that already end in `.toml` are used as given.
#[derive(Debug, Clone)]
pub struct ManifestContribLoader {
    base_dir: PathBuf,
}

impl ManifestContribLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path a given identifier resolves to.
    pub fn manifest_path(&self, identifier: &str) -> PathBuf {
        let path = self.base_dir.join(identifier);
        if path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION) {
            path
        } else {
            self.base_dir
                .join(format!("{identifier}.{MANIFEST_EXTENSION}"))
        }
    }
}

impl ContribLoader for ManifestContribLoader {
    fn resolve(&self, identifier: &str) -> Result<Vec<Feature>, PipelineError> {
        let path = self.manifest_path(identifier);
        tracing::debug!(identifier, path = %path.display(), "Loading contrib manifest");

        let content = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::contrib_load(identifier, format!("{}: {e}", path.display()))
        })?;
        let manifest = FeatureManifest::from_toml(&content).map_err(|e| {
            PipelineError::contrib_load(identifier, format!("malformed manifest: {e}"))
        })?;
        manifest
            .build()
            .map_err(|e| PipelineError::contrib_load(identifier, e.to_string()))
    }
}
