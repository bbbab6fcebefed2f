//! # fhub-core: grouped temporal feature pipelines
//!
//! Declarative features bind named input columns to an ordered chain of
//! fit/transform stages. A [`FeatureRegistry`] collects static and
//! contributed features, [`FeatureRegistry::finalize`] freezes them into a
//! collision-free [`FeaturePlan`], and a [`PipelineExecutor`] fits each
//! chain against a `(entity, time)`-indexed [`Dataset`] and assembles one
//! wide [`FeatureMatrix`] in plan order.
//!
//! ```ignore
//! let mut registry = FeatureRegistry::new();
//! registry.register(static_features()?);
//! registry.merge_contrib_from_config(&loader, &config)?;
//! let plan = registry.finalize()?;
//! let matrix = PipelineExecutor::new().run(&dataset, &plan)?;
//! ```

pub mod context;
pub mod contrib;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod feature;
pub mod registry;
pub mod transformer;

pub use context::{GLOBAL_GROUP, Group, GroupBy, GroupedTemporalContext};
pub use contrib::{ConfigLookup, ContribLoader, FeatureProvider, StaticContribLoader};
pub use dataset::{Column, Dataset, Frame, RowKey};
pub use error::{PipelineError, TransformError};
pub use executor::{
    ExecutorOptions, FeatureMatrix, FeatureSpan, FittedFeature, FittedPipeline, PipelineExecutor,
};
pub use feature::{Feature, FeatureDescription};
pub use registry::{FeaturePlan, FeatureRegistry};
pub use transformer::{FittedTransformer, FunctionTransformer, Transformer, ValueFn};
