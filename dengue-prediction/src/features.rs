//! Feature and target declarations for the dengue incidence model.

use fhub_core::{
    ConfigLookup, ContribLoader, Feature, FeaturePlan, FeatureRegistry, PipelineError,
};
use fhub_transformers::{
    IdentityTransformer, LagImputer, MeanImputer, NullFiller, NullIndicator, Pca, SingleLagger,
    StandardScaler, log1p,
};
use tracing::info;

/// Series that get the same basic cleaning: carry forward, zero-fill, scale.
pub const CLIMATE_SERIES: [&str; 14] = [
    "reanalysis_air_temp_k",
    "reanalysis_avg_temp_k",
    "reanalysis_dew_point_temp_k",
    "reanalysis_max_air_temp_k",
    "reanalysis_min_air_temp_k",
    "reanalysis_precip_amt_kg_per_m2",
    "reanalysis_relative_humidity_percent",
    "reanalysis_specific_humidity_g_per_kg",
    "reanalysis_tdtr_k",
    "station_avg_temp_c",
    "station_diur_temp_rng_c",
    "station_max_temp_c",
    "station_min_temp_c",
    "station_precip_mm",
];

/// Inputs projected jointly onto two principal components.
pub const MOISTURE_BLOCK: [&str; 6] = [
    "reanalysis_sat_precip_amt_mm",
    "reanalysis_relative_humidity_percent",
    "reanalysis_specific_humidity_g_per_kg",
    "reanalysis_precip_amt_kg_per_m2",
    "precipitation_amt_mm",
    "station_precip_mm",
];

/// Prediction target column.
pub const TARGET: &str = "total_cases";

fn imputed_and_scaled(input: &str) -> Result<Feature, PipelineError> {
    Feature::single(
        input,
        vec![
            Box::new(LagImputer::by_entity()),
            Box::new(MeanImputer),
            Box::new(StandardScaler),
        ],
    )
}

/// Statically declared features, in output order.
pub fn static_features() -> Result<Vec<Feature>, PipelineError> {
    let mut features = vec![
        imputed_and_scaled("ndvi_se")?,
        imputed_and_scaled("ndvi_sw")?,
        Feature::single(
            "precipitation_amt_mm",
            vec![
                Box::new(LagImputer::by_entity()),
                Box::new(MeanImputer),
                Box::new(log1p()),
            ],
        )?,
        Feature::single("precipitation_amt_mm", vec![Box::new(NullIndicator)])?,
    ];

    for input in CLIMATE_SERIES {
        features.push(Feature::single(
            input,
            vec![
                Box::new(LagImputer::by_entity()),
                Box::new(NullFiller::new(0.0)),
                Box::new(StandardScaler),
            ],
        )?);
    }

    features.push(Feature::single(
        "reanalysis_sat_precip_amt_mm",
        vec![
            Box::new(SingleLagger::by_entity(1)),
            Box::new(LagImputer::by_entity()),
            Box::new(NullFiller::new(0.0)),
        ],
    )?);

    features.push(Feature::new(
        MOISTURE_BLOCK,
        vec![
            Box::new(LagImputer::by_entity()),
            Box::new(MeanImputer),
            Box::new(Pca::new(2)),
        ],
    )?);

    Ok(features)
}

/// Static features followed by the configured contrib module's features.
///
/// Fails if the contrib module is not configured or cannot be resolved, or if
/// any two features share an output identity.
pub fn feature_transformations(
    loader: &dyn ContribLoader,
    config: &dyn ConfigLookup,
) -> Result<FeaturePlan, PipelineError> {
    let mut registry = FeatureRegistry::new();
    registry.register(static_features()?);
    registry.merge_contrib_from_config(loader, config)?;
    let plan = registry.finalize()?;
    info!(
        features = plan.len(),
        contributed = plan.contrib_count(),
        "Resolved feature plan"
    );
    Ok(plan)
}

/// The target passes through unchanged.
pub fn target_transformations() -> Result<FeaturePlan, PipelineError> {
    let mut registry = FeatureRegistry::new();
    registry.push(Feature::single(TARGET, vec![Box::new(IdentityTransformer)])?);
    registry.finalize()
}
