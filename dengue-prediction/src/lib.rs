//! # dengue-prediction
//!
//! Feature declarations for weekly dengue incidence models. The static feature
//! list lives in [`features`]; extra features come from the contrib module named
//! by `contrib.module_name` in the layered [`config`], resolved through
//! [`contrib::DengueContribLoader`].

pub mod config;
pub mod contrib;
pub mod features;

pub use config::{DengueConfig, load_config};
pub use contrib::{DengueContribLoader, builtin_modules};
pub use features::{feature_transformations, static_features, target_transformations};
