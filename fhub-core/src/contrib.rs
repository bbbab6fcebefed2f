//! Externally contributed features.
//!
//! A [`ContribLoader`] turns an opaque module identifier into a sequence of
//! feature definitions. The identifier itself comes from configuration via
//! [`ConfigLookup`]; the core never parses it.

use crate::error::PipelineError;
use crate::feature::Feature;
use std::collections::BTreeMap;
use std::fmt;

/// Configuration section holding the contrib settings.
pub const CONTRIB_SECTION: &str = "contrib";
/// Configuration key holding the contrib module identifier.
pub const CONTRIB_MODULE_KEY: &str = "module_name";

/// Resolves a module identifier to contributed feature definitions.
pub trait ContribLoader: Send + Sync {
    /// Return the features exposed by `identifier`, in the order they should be merged.
    ///
    /// An identifier that cannot be resolved must fail with
    /// [`PipelineError::ContribLoad`], never resolve to an empty list.
    fn resolve(&self, identifier: &str) -> Result<Vec<Feature>, PipelineError>;
}

/// Externally owned `(section, key) -> value` configuration lookup.
pub trait ConfigLookup {
    fn lookup(&self, section: &str, key: &str) -> Option<String>;
}

impl ConfigLookup for BTreeMap<(String, String), String> {
    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.get(&(section.to_string(), key.to_string())).cloned()
    }
}

/// A JSON object of sections, e.g. a serialized config struct.
impl ConfigLookup for serde_json::Value {
    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        match self.get(section)?.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Function that builds a contributed feature list.
pub type FeatureProvider = fn() -> Result<Vec<Feature>, PipelineError>;

/// String-keyed registry of feature providers compiled into the binary.
#[derive(Default, Clone)]
pub struct StaticContribLoader {
    providers: BTreeMap<String, FeatureProvider>,
}

impl StaticContribLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `identifier`, replacing any earlier registration.
    pub fn register(&mut self, identifier: impl Into<String>, provider: FeatureProvider) {
        self.providers.insert(identifier.into(), provider);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, identifier: impl Into<String>, provider: FeatureProvider) -> Self {
        self.register(identifier, provider);
        self
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for StaticContribLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticContribLoader")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

impl ContribLoader for StaticContribLoader {
    fn resolve(&self, identifier: &str) -> Result<Vec<Feature>, PipelineError> {
        let provider = self.providers.get(identifier).ok_or_else(|| {
            PipelineError::contrib_load(identifier, "no contrib module registered under this name")
        })?;
        provider().map_err(|e| match e {
            err @ PipelineError::ContribLoad { .. } => err,
            other => PipelineError::contrib_load(identifier, other.to_string()),
        })
    }
}
