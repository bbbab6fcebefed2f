//! Full dengue feature plan against synthetic weekly records.

use dengue_prediction::config::DEFAULT_CONTRIB_MODULE;
use dengue_prediction::features::{CLIMATE_SERIES, MOISTURE_BLOCK, TARGET};
use dengue_prediction::{
    DengueConfig, DengueContribLoader, feature_transformations, load_config,
    target_transformations,
};
use fhub_core::{Dataset, PipelineError, PipelineExecutor, RowKey};
use pretty_assertions::assert_eq;

fn measurement_columns() -> Vec<&'static str> {
    let mut cols = vec![
        "ndvi_ne",
        "ndvi_nw",
        "ndvi_se",
        "ndvi_sw",
        "precipitation_amt_mm",
        "reanalysis_sat_precip_amt_mm",
    ];
    cols.extend(CLIMATE_SERIES);
    cols
}

/// Ten weeks for two cities; `sj` misses its precipitation in week 3.
fn dataset() -> Dataset {
    let mut names = measurement_columns();
    names.push(TARGET);
    let mut rows = Vec::new();
    for (c, city) in ["sj", "iq"].into_iter().enumerate() {
        for week in 1..=10i64 {
            let mut row: Vec<Option<f64>> = (0..names.len() - 1)
                .map(|j| {
                    let v = (week * 7 + j as i64 * 3 + c as i64 * 5) % 11;
                    Some(v as f64 + 0.5 * c as f64)
                })
                .collect();
            if city == "sj" && week == 3 {
                row[4] = None;
            }
            row.push(Some((week * 2 + c as i64) as f64));
            rows.push((RowKey::new(city, week), row));
        }
    }
    Dataset::from_rows(&names, rows).unwrap()
}

fn default_plan() -> fhub_core::FeaturePlan {
    let config = DengueConfig::default();
    feature_transformations(&DengueContribLoader::from_config(&config), &config).unwrap()
}

#[test]
fn full_plan_produces_expected_columns() {
    let config = DengueConfig::default();
    let loader = DengueContribLoader::from_config(&config);
    let plan = feature_transformations(&loader, &config).unwrap();

    assert_eq!(plan.static_count(), 4 + CLIMATE_SERIES.len() + 2);
    assert_eq!(plan.contrib_count(), 2);

    let dataset = dataset();
    let matrix = PipelineExecutor::new().run(&dataset, &plan).unwrap();

    // Every feature yields one column except the two-component projection.
    assert_eq!(matrix.n_columns(), plan.len() + 1);
    assert_eq!(matrix.n_rows(), 20);

    let pca_identity = format!(
        "{}|lag_imputer(by=entity)>mean_imputer>pca(2)",
        MOISTURE_BLOCK.join("+")
    );
    let pca_columns = matrix.feature_columns(&pca_identity).unwrap();
    assert_eq!(pca_columns.len(), 2);
    assert_eq!(pca_columns[0].name, format!("{pca_identity}_0"));

    // Contributed features come last, in contrib order.
    let names = matrix.column_names();
    assert_eq!(
        &names[names.len() - 2..],
        &[
            "ndvi_ne|lag_imputer(by=entity)>mean_imputer>standard_scaler",
            "ndvi_nw|lag_imputer(by=entity)>mean_imputer>standard_scaler",
        ]
    );
}

#[test]
fn precipitation_gap_is_filled_within_city() {
    let plan = default_plan();
    let dataset = dataset();
    let matrix = PipelineExecutor::new().run(&dataset, &plan).unwrap();

    let raw = dataset.column("precipitation_amt_mm").unwrap();
    let sj_week2 = raw.values[1].unwrap();
    let logged = "precipitation_amt_mm|lag_imputer(by=entity)>mean_imputer>log1p";
    assert_eq!(
        matrix.value(logged, "sj", 3),
        Some(Some(sj_week2.ln_1p()))
    );
    assert_eq!(
        matrix.value("precipitation_amt_mm|null_indicator", "sj", 3),
        Some(Some(1.0))
    );
    assert_eq!(
        matrix.value("precipitation_amt_mm|null_indicator", "iq", 3),
        Some(Some(0.0))
    );
}

#[test]
fn lagged_satellite_precip_starts_each_city_at_zero() {
    let plan = default_plan();
    let dataset = dataset();
    let matrix = PipelineExecutor::new().run(&dataset, &plan).unwrap();

    let lagged = "reanalysis_sat_precip_amt_mm|single_lagger(1, by=entity)>lag_imputer(by=entity)>null_filler(0)";
    let raw = dataset.column("reanalysis_sat_precip_amt_mm").unwrap();
    for (city, offset) in [("sj", 0), ("iq", 10)] {
        assert_eq!(matrix.value(lagged, city, 1), Some(Some(0.0)));
        assert_eq!(
            matrix.value(lagged, city, 2),
            Some(raw.values[offset])
        );
    }
}

#[test]
fn target_plan_passes_cases_through() {
    let dataset = dataset();
    let matrix = PipelineExecutor::new()
        .run(&dataset, &target_transformations().unwrap())
        .unwrap();
    assert_eq!(matrix.column_names(), vec!["total_cases|identity"]);
    assert_eq!(
        matrix.value("total_cases|identity", "iq", 4),
        Some(Some(9.0))
    );
    assert_eq!(
        matrix.column("total_cases|identity").unwrap().values,
        dataset.column(TARGET).unwrap().values
    );
}

#[test]
fn missing_input_column_is_schema_error() {
    let plan = default_plan();
    let dataset =
        Dataset::from_rows(&["ndvi_se"], [(RowKey::new("sj", 1), vec![Some(0.1)])]).unwrap();
    let err = PipelineExecutor::new().run(&dataset, &plan).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { ref column, .. } if column == "ndvi_sw"));
}

#[test]
fn workspace_manifest_module_replaces_builtin() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("contrib")).unwrap();
    std::fs::write(
        dir.path().join("dengue.toml"),
        "[contrib]\nmodule_name = \"team_b\"\nmanifest_dir = \"contrib\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("contrib").join("team_b.toml"),
        r#"
        [[feature]]
        input = "station_max_temp_c"
        name = "max_temp_lag2"
        stages = [
            { type = "single_lagger", lag = 2 },
            { type = "lag_imputer" },
            { type = "null_filler", replacement = 0.0 },
        ]
        "#,
    )
    .unwrap();

    let config = load_config(Some(dir.path()), None).unwrap();
    let loader = DengueContribLoader::from_config(&config);
    let plan = feature_transformations(&loader, &config).unwrap();
    assert_eq!(plan.contrib_count(), 1);
    assert_eq!(plan.identities().last().map(String::as_str), Some("max_temp_lag2"));

    let dataset = dataset();
    let matrix = PipelineExecutor::new().run(&dataset, &plan).unwrap();
    let raw = dataset.column("station_max_temp_c").unwrap();
    assert_eq!(
        matrix.value("max_temp_lag2", "iq", 5),
        Some(raw.values[12])
    );
}

#[test]
fn unresolvable_contrib_module_aborts() {
    let mut config = DengueConfig::default();
    config.contrib.module_name = "no.such.module".into();
    let err = feature_transformations(&DengueContribLoader::from_config(&config), &config)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ContribLoad { ref identifier, .. } if identifier == "no.such.module"
    ));
    assert_ne!(config.contrib.module_name, DEFAULT_CONTRIB_MODULE);
}

#[test]
fn execution_config_does_not_change_output() {
    let mut config = DengueConfig::default();
    config.execution.parallel = true;
    let executor = PipelineExecutor::with_options(config.execution.executor_options());
    let plan = default_plan();

    let configured = executor.run(&dataset(), &plan).unwrap();
    let sequential = PipelineExecutor::new().run(&dataset(), &plan).unwrap();
    assert_eq!(configured.column_names(), sequential.column_names());
    assert_eq!(configured.to_rows(), sequential.to_rows());
}
