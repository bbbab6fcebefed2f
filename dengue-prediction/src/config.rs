//! Project configuration.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace `dengue.toml` -> environment -> explicit overrides.

use fhub_core::contrib::{CONTRIB_MODULE_KEY, CONTRIB_SECTION};
use fhub_core::{ConfigLookup, ExecutorOptions};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identifier of the contrib module compiled into this crate.
pub const DEFAULT_CONTRIB_MODULE: &str = "dengue_prediction.contrib";

/// File name of the workspace-level config.
pub const WORKSPACE_CONFIG_FILE: &str = "dengue.toml";

const ENV_PREFIX: &str = "DENGUE_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DengueConfig {
    #[serde(default)]
    pub contrib: ContribConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Where contributed features come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContribConfig {
    /// Identifier handed to the contrib loader.
    #[serde(default = "default_module_name")]
    pub module_name: String,
    /// Directory searched for `<module_name>.toml` manifests when the
    /// identifier is not a built-in module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_dir: Option<PathBuf>,
}

fn default_module_name() -> String {
    DEFAULT_CONTRIB_MODULE.to_string()
}

impl Default for ContribConfig {
    fn default() -> Self {
        Self {
            module_name: default_module_name(),
            manifest_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Fit features concurrently (needs the `parallel` cargo feature).
    #[serde(default)]
    pub parallel: bool,
}

impl ExecutionConfig {
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            parallel: self.parallel,
        }
    }
}

impl ConfigLookup for DengueConfig {
    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        match (section, key) {
            (CONTRIB_SECTION, CONTRIB_MODULE_KEY) => Some(self.contrib.module_name.clone()),
            (CONTRIB_SECTION, "manifest_dir") => self
                .contrib
                .manifest_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            ("execution", "parallel") => Some(self.execution.parallel.to_string()),
            _ => None,
        }
    }
}

/// User-level config path (`~/.config/dengue-prediction/config.toml` on Linux).
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "dengue-prediction", "dengue-prediction")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration with layered merging.
///
/// Priority (highest first):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `DENGUE_`, sections split on `__`)
/// 3. Workspace config (`dengue.toml`)
/// 4. User config
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&DengueConfig>,
) -> Result<DengueConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(DengueConfig::default()));

    if let Some(user_config) = user_config_path().filter(|p| p.exists()) {
        figment = figment.merge(Toml::file(user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(ws_config));
        }
    }

    // DENGUE_CONTRIB__MODULE_NAME, DENGUE_EXECUTION__PARALLEL, ...
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let mut config: DengueConfig = figment.extract().map_err(Box::new)?;

    // Relative manifest directories are anchored at the workspace.
    if let (Some(ws), Some(dir)) = (workspace, config.contrib.manifest_dir.as_mut()) {
        if dir.is_relative() {
            *dir = ws.join(&*dir);
        }
    }
    Ok(config)
}
