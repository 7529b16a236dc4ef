use pretty_assertions::assert_eq;
use revenue_forecast::{EngineConfig, ForecastEngine, ForecastError, ModelLoader, RevenueStream};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_resolves_models_dir_against_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("revenue.toml");
    fs::write(
        &config_path,
        r#"
models_dir = "artifacts"

[forecast]
horizon_months = 6
seed = 7
min_components = 3

[scenario]
reference_vat_rate = 15.0
"#,
    )
    .unwrap();

    let config = EngineConfig::load(&config_path).unwrap();

    assert_eq!(config.models_dir, dir.path().join("artifacts"));
    assert_eq!(config.forecast.horizon_months, 6);
    assert_eq!(config.forecast.min_components, 3);
    assert_eq!(config.scenario.reference_vat_rate, 15.0);
    assert_eq!(config.scenario.reference_income_rate, 37.5);

    let loader = ModelLoader::new(&config);
    assert_eq!(
        loader.artifact_path(RevenueStream::CustomsDuties),
        dir.path().join("artifacts").join("Customs_Duties_model.json")
    );
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = EngineConfig::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ForecastError::Io(_))));
}

#[test]
fn test_invalid_values_are_rejected() {
    for text in [
        "[forecast]\nhorizon_months = 0\n",
        "[forecast]\nmodel_noise = -0.1\n",
        "[scenario]\nreference_corporate_rate = 0.0\n",
        "[scenario.elasticities]\nVAT = -1.0\n",
    ] {
        assert!(
            matches!(EngineConfig::from_toml_str(text), Err(ForecastError::Config(_))),
            "accepted: {}",
            text
        );
    }
}

#[test]
fn test_missing_models_dir_falls_back_everywhere() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_models_dir(dir.path().join("nowhere"));

    let engine = ForecastEngine::from_config(&config).unwrap();

    assert_eq!(engine.models().loaded_count(), 0);
    assert_eq!(engine.models().fallback_count(), RevenueStream::ALL.len());
    let annual = engine.generate_annual_forecast().unwrap();
    assert_eq!(annual.forecasts.len(), RevenueStream::ALL.len());
    assert!(annual.forecasts.values().all(|s| s.len() == 12));
}
