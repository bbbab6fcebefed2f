//! Pipeline execution: fit and apply every feature chain, then assemble the matrix.

use crate::context::GroupedTemporalContext;
use crate::dataset::{Column, Dataset, Frame, RowKey};
use crate::error::PipelineError;
use crate::feature::Feature;
use crate::registry::FeaturePlan;
use crate::transformer::FittedTransformer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// Execution switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorOptions {
    /// Fit features concurrently. Requires the `parallel` cargo feature.
    #[serde(default)]
    pub parallel: bool,
}

/// Walks a [`FeaturePlan`] against a dataset.
#[derive(Debug, Clone, Default)]
pub struct PipelineExecutor {
    options: ExecutorOptions,
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExecutorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ExecutorOptions {
        self.options
    }

    /// Fit every feature on `dataset` and return the assembled training matrix.
    ///
    /// Fails fast: the first failing feature (in plan order) aborts the run.
    pub fn run(
        &self,
        dataset: &Dataset,
        plan: &FeaturePlan,
    ) -> Result<FeatureMatrix, PipelineError> {
        let fitted = self.fit_all(dataset, plan)?;
        let outputs = fitted
            .into_iter()
            .map(|(feature, frame)| (feature.identity, frame))
            .collect();
        assemble(dataset.shared_index(), outputs)
    }

    /// Fit every feature on `dataset`, keeping the fitted state for later transforms.
    pub fn fit(
        &self,
        dataset: &Dataset,
        plan: &FeaturePlan,
    ) -> Result<FittedPipeline, PipelineError> {
        let features = self
            .fit_all(dataset, plan)?
            .into_iter()
            .map(|(feature, _)| feature)
            .collect();
        Ok(FittedPipeline { features })
    }

    fn fit_all(
        &self,
        dataset: &Dataset,
        plan: &FeaturePlan,
    ) -> Result<Vec<(FittedFeature, Frame)>, PipelineError> {
        let ctx = GroupedTemporalContext::from_index(Arc::clone(dataset.shared_index()));
        info!(
            features = plan.len(),
            rows = dataset.len(),
            entities = ctx.entity_count(),
            "Fitting feature pipeline"
        );

        let results = self.fit_features(plan.features(), dataset, &ctx);
        let fitted = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        info!(features = fitted.len(), "Feature pipeline fitted");
        Ok(fitted)
    }

    #[cfg(feature = "parallel")]
    fn fit_features(
        &self,
        features: &[Feature],
        dataset: &Dataset,
        ctx: &GroupedTemporalContext,
    ) -> Vec<Result<(FittedFeature, Frame), PipelineError>> {
        use rayon::prelude::*;

        if self.options.parallel {
            return features
                .par_iter()
                .map(|f| fit_feature(f, dataset, ctx))
                .collect();
        }
        fit_sequential(features, dataset, ctx)
    }

    #[cfg(not(feature = "parallel"))]
    fn fit_features(
        &self,
        features: &[Feature],
        dataset: &Dataset,
        ctx: &GroupedTemporalContext,
    ) -> Vec<Result<(FittedFeature, Frame), PipelineError>> {
        if self.options.parallel {
            tracing::warn!(
                "Parallel execution requested but the `parallel` feature is not enabled"
            );
        }
        fit_sequential(features, dataset, ctx)
    }
}

/// Stop at the first failure; later features are never fitted.
fn fit_sequential(
    features: &[Feature],
    dataset: &Dataset,
    ctx: &GroupedTemporalContext,
) -> Vec<Result<(FittedFeature, Frame), PipelineError>> {
    let mut results = Vec::with_capacity(features.len());
    for feature in features {
        let result = fit_feature(feature, dataset, ctx);
        let failed = result.is_err();
        results.push(result);
        if failed {
            break;
        }
    }
    results
}

fn select_inputs(
    feature_id: &str,
    inputs: &[String],
    dataset: &Dataset,
) -> Result<Frame, PipelineError> {
    dataset
        .select(inputs)
        .map_err(|column| PipelineError::schema(feature_id, column))
}

/// Fit one feature's chain: each stage is fitted on the previous stage's output.
fn fit_feature(
    feature: &Feature,
    dataset: &Dataset,
    ctx: &GroupedTemporalContext,
) -> Result<(FittedFeature, Frame), PipelineError> {
    let identity = feature.identity();
    let mut frame = select_inputs(&identity, feature.inputs(), dataset)?;
    let mut stages = Vec::with_capacity(feature.chain().len());
    let mut stage_names = Vec::with_capacity(feature.chain().len());
    let mut stage_widths = Vec::with_capacity(feature.chain().len());

    for (position, stage) in feature.chain().iter().enumerate() {
        let name = stage.describe();
        let group_aware = stage.is_group_aware();
        debug!(feature = %identity, stage = position, %name, group_aware, "Fitting stage");
        let fitted = stage
            .fit(&frame, ctx)
            .map_err(|e| PipelineError::transform(&identity, position, &name, e))?;
        let next = fitted
            .transform(&frame, ctx)
            .map_err(|e| PipelineError::transform(&identity, position, &name, e))?;
        let expected = stage.output_width(frame.width());
        check_stage_output(&identity, position, &name, expected, &frame, &next)?;
        frame = next;
        stages.push(fitted);
        stage_names.push(name);
        stage_widths.push(expected);
    }

    let fitted = FittedFeature {
        output_names: feature.output_names(frame.width()),
        identity,
        inputs: feature.inputs().to_vec(),
        stage_names,
        stage_widths,
        stages,
    };
    let frame = frame.rename_columns(&fitted.output_names);
    Ok((fitted, frame))
}

fn check_stage_output(
    feature: &str,
    position: usize,
    name: &str,
    expected_width: usize,
    input: &Frame,
    output: &Frame,
) -> Result<(), PipelineError> {
    let fail = |message: String| {
        Err(PipelineError::Transform {
            feature: feature.to_string(),
            stage: position,
            stage_name: name.to_string(),
            group: None,
            message,
        })
    };
    if output.len() != input.len() {
        return fail(format!(
            "stage changed the row count from {} to {}",
            input.len(),
            output.len()
        ));
    }
    if output.width() == 0 {
        return fail("stage produced no columns".to_string());
    }
    if output.width() != expected_width {
        return fail(format!(
            "stage produced {} columns but declares {expected_width}",
            output.width()
        ));
    }
    Ok(())
}

fn assemble(
    index: &Arc<[RowKey]>,
    outputs: Vec<(String, Frame)>,
) -> Result<FeatureMatrix, PipelineError> {
    let mut columns = Vec::new();
    let mut spans = Vec::with_capacity(outputs.len());
    let mut owners: HashMap<String, usize> = HashMap::new();

    for (position, (identity, frame)) in outputs.into_iter().enumerate() {
        let start = columns.len();
        for column in frame.into_columns() {
            if let Some(&first) = owners.get(&column.name) {
                return Err(PipelineError::DuplicateFeature {
                    name: column.name,
                    first,
                    second: position,
                });
            }
            owners.insert(column.name.clone(), position);
            columns.push(column);
        }
        spans.push(FeatureSpan {
            identity,
            columns: start..columns.len(),
        });
    }

    Ok(FeatureMatrix {
        index: Arc::clone(index),
        columns,
        spans,
    })
}

/// One feature's fitted chain.
#[derive(Debug)]
pub struct FittedFeature {
    identity: String,
    inputs: Vec<String>,
    stage_names: Vec<String>,
    /// Declared output width of each stage, as seen during fitting.
    stage_widths: Vec<usize>,
    stages: Vec<Box<dyn FittedTransformer>>,
    output_names: Vec<String>,
}

impl FittedFeature {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn transform(
        &self,
        dataset: &Dataset,
        ctx: &GroupedTemporalContext,
    ) -> Result<Frame, PipelineError> {
        let mut frame = select_inputs(&self.identity, &self.inputs, dataset)?;
        let chain = self.stages.iter().zip(&self.stage_names).zip(&self.stage_widths);
        for (position, ((stage, name), &width)) in chain.enumerate() {
            let next = stage
                .transform(&frame, ctx)
                .map_err(|e| PipelineError::transform(&self.identity, position, name, e))?;
            check_stage_output(&self.identity, position, name, width, &frame, &next)?;
            frame = next;
        }
        Ok(frame.rename_columns(&self.output_names))
    }
}

/// Fitted state for a whole plan. Dropping it ends the run's state lifetime.
#[derive(Debug)]
pub struct FittedPipeline {
    features: Vec<FittedFeature>,
}

impl FittedPipeline {
    /// Apply the fitted chains to `dataset` (e.g. later weeks of the same cities).
    pub fn transform(&self, dataset: &Dataset) -> Result<FeatureMatrix, PipelineError> {
        let ctx = GroupedTemporalContext::from_index(Arc::clone(dataset.shared_index()));
        debug!(features = self.features.len(), rows = dataset.len(), "Transforming dataset");
        let outputs = self
            .features
            .iter()
            .map(|f| Ok((f.identity.clone(), f.transform(dataset, &ctx)?)))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        assemble(dataset.shared_index(), outputs)
    }

    pub fn features(&self) -> &[FittedFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Columns contributed by one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpan {
    pub identity: String,
    pub columns: Range<usize>,
}

/// The assembled output: feature columns in plan order on the dataset's index.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    index: Arc<[RowKey]>,
    columns: Vec<Column>,
    spans: Vec<FeatureSpan>,
}

impl FeatureMatrix {
    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Per-feature column ranges, in plan order.
    pub fn spans(&self) -> &[FeatureSpan] {
        &self.spans
    }

    /// Columns produced by the feature with the given identity.
    pub fn feature_columns(&self, identity: &str) -> Option<&[Column]> {
        self.spans
            .iter()
            .find(|s| s.identity == identity)
            .map(|s| &self.columns[s.columns.clone()])
    }

    /// Value at the row keyed `(entity, time)` in column `name`.
    pub fn value(&self, name: &str, entity: &str, time: i64) -> Option<Option<f64>> {
        let row = self
            .index
            .iter()
            .position(|k| k.entity == entity && k.time == time)?;
        self.column(name).map(|c| c.values[row])
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Row-major copy of the matrix.
    pub fn to_rows(&self) -> Vec<Vec<Option<f64>>> {
        (0..self.n_rows())
            .map(|row| self.columns.iter().map(|c| c.values[row]).collect())
            .collect()
    }
}
