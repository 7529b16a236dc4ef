//! Model artifact loading
//!
//! Artifacts are JSON files named `<label>_model.json` in the configured
//! models directory. The current layout is an envelope:
//!
//! ```json
//! {"format_version": 2, "family": "gradient_boosted_tree", "params": {...}}
//! ```
//!
//! Older exports are flat objects carrying a `model_type` type signature next
//! to the parameters. Decoding tries the current layout first and retries once
//! in legacy mode. No failure escapes [`ModelLoader::load_all`]; every stream
//! that does not load is simply absent from the handle set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::ModelLoadError;
use crate::models::{ModelFamily, ModelHandle, PredictiveModel};
use crate::stream::RevenueStream;

/// Artifact layout version written by current exporters
pub const CURRENT_FORMAT_VERSION: u32 = 2;

/// How an artifact is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Versioned envelope with a known family tag
    Strict,
    /// Flat legacy object classified by its `model_type` signature
    Legacy,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArtifactEnvelope {
    format_version: u32,
    family: String,
    params: Value,
}

/// Decode artifact bytes in the given mode
pub fn decode_artifact(
    bytes: &[u8],
    mode: DecodeMode,
) -> Result<PredictiveModel, ModelLoadError> {
    match mode {
        DecodeMode::Strict => decode_strict(bytes),
        DecodeMode::Legacy => decode_legacy(bytes),
    }
}

fn decode_strict(bytes: &[u8]) -> Result<PredictiveModel, ModelLoadError> {
    let envelope: ArtifactEnvelope =
        serde_json::from_slice(bytes).map_err(|e| ModelLoadError::Decode(e.to_string()))?;

    if envelope.format_version != CURRENT_FORMAT_VERSION {
        return Err(ModelLoadError::UnsupportedVersion(envelope.format_version));
    }

    let family = match envelope.family.as_str() {
        "time_series_regression" => ModelFamily::TimeSeriesRegression,
        "gradient_boosted_tree" => ModelFamily::GradientBoostedTree,
        "lightweight_heuristic" => ModelFamily::LightweightHeuristic,
        other => {
            return Err(ModelLoadError::Decode(format!(
                "Unknown family tag '{}'",
                other
            )))
        }
    };

    build_model(family, envelope.params, &envelope.family)
}

fn decode_legacy(bytes: &[u8]) -> Result<PredictiveModel, ModelLoadError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ModelLoadError::Decode(e.to_string()))?;

    let Value::Object(mut fields) = value else {
        return Err(ModelLoadError::Decode(
            "Legacy artifact is not an object".to_string(),
        ));
    };

    let signature = match fields
        .remove("model_type")
        .or_else(|| fields.remove("type"))
    {
        Some(Value::String(signature)) => signature,
        _ => {
            return Err(ModelLoadError::Decode(
                "Legacy artifact has no type signature".to_string(),
            ))
        }
    };

    let family = ModelFamily::classify(&signature);
    build_model(family, Value::Object(fields), &signature)
}

fn build_model(
    family: ModelFamily,
    params: Value,
    signature: &str,
) -> Result<PredictiveModel, ModelLoadError> {
    let decode = |e: serde_json::Error| ModelLoadError::Decode(format!("{}: {}", signature, e));

    let model = match family {
        ModelFamily::TimeSeriesRegression => {
            PredictiveModel::TimeSeriesRegression(serde_json::from_value(params).map_err(decode)?)
        }
        ModelFamily::GradientBoostedTree => {
            PredictiveModel::GradientBoostedTree(serde_json::from_value(params).map_err(decode)?)
        }
        ModelFamily::LightweightHeuristic => {
            PredictiveModel::LightweightHeuristic(serde_json::from_value(params).map_err(decode)?)
        }
        ModelFamily::Unknown => return Err(ModelLoadError::MissingPredict(signature.to_string())),
    };

    Ok(model)
}

/// What happened when loading one stream's artifact
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        family: ModelFamily,
        mode: DecodeMode,
    },
    /// No artifact on disk
    Missing,
    /// The artifact could not be read or decoded in either mode
    Rejected { reason: String },
    /// The artifact decoded but cannot predict
    Invalid { signature: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded { family, mode } => write!(f, "loaded {} ({:?})", family, mode),
            LoadOutcome::Missing => f.write_str("missing"),
            LoadOutcome::Rejected { reason } => write!(f, "rejected: {}", reason),
            LoadOutcome::Invalid { signature } => write!(f, "invalid: {}", signature),
        }
    }
}

/// Handles for every stream that loaded, plus the outcome of every attempt
#[derive(Debug, Clone, Default)]
pub struct LoadedModels {
    handles: BTreeMap<RevenueStream, ModelHandle>,
    outcomes: BTreeMap<RevenueStream, LoadOutcome>,
}

impl LoadedModels {
    /// A model set where nothing loaded; every stream uses its fallback
    pub fn empty() -> Self {
        let outcomes = RevenueStream::ALL
            .iter()
            .map(|&stream| (stream, LoadOutcome::Missing))
            .collect();

        Self {
            handles: BTreeMap::new(),
            outcomes,
        }
    }

    /// Build a model set from handles created in memory
    pub fn from_handles(handles: impl IntoIterator<Item = ModelHandle>) -> Self {
        let mut models = Self::empty();
        for handle in handles {
            let stream = handle.stream();
            models.outcomes.insert(
                stream,
                LoadOutcome::Loaded {
                    family: handle.family(),
                    mode: DecodeMode::Strict,
                },
            );
            models.handles.insert(stream, handle);
        }
        models
    }

    pub fn handle(&self, stream: RevenueStream) -> Option<&ModelHandle> {
        self.handles.get(&stream)
    }

    pub fn handles(&self) -> impl Iterator<Item = &ModelHandle> {
        self.handles.values()
    }

    pub fn outcome(&self, stream: RevenueStream) -> Option<&LoadOutcome> {
        self.outcomes.get(&stream)
    }

    pub fn loaded_count(&self) -> usize {
        self.handles.len()
    }

    pub fn fallback_count(&self) -> usize {
        RevenueStream::ALL.len() - self.handles.len()
    }
}

/// Loads every stream's artifact from the configured models directory
#[derive(Debug)]
pub struct ModelLoader<'a> {
    config: &'a EngineConfig,
}

impl<'a> ModelLoader<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Path of a stream's artifact
    pub fn artifact_path(&self, stream: RevenueStream) -> PathBuf {
        self.config.models_dir.join(stream.artifact_file_name())
    }

    /// Attempt every stream. Never fails; see [`LoadedModels::outcome`].
    pub fn load_all(&self) -> LoadedModels {
        info!(models_dir = %self.config.models_dir.display(), "Loading revenue models");

        let mut models = LoadedModels::default();

        for stream in RevenueStream::ALL {
            let path = self.artifact_path(stream);
            let outcome = match self.load_stream(stream, &path) {
                Ok((handle, mode)) => {
                    info!(stream = %stream, family = %handle.family(), ?mode, "Loaded model");
                    let outcome = LoadOutcome::Loaded {
                        family: handle.family(),
                        mode,
                    };
                    models.handles.insert(stream, handle);
                    outcome
                }
                Err(ModelLoadError::NotFound(_)) => {
                    debug!(stream = %stream, path = %path.display(), "No model artifact, using fallback");
                    LoadOutcome::Missing
                }
                Err(ModelLoadError::MissingPredict(signature)) => {
                    warn!(stream = %stream, %signature, "Model has no predict capability, using fallback");
                    LoadOutcome::Invalid { signature }
                }
                Err(err) => {
                    warn!(stream = %stream, error = %err, "Model failed to load, using fallback");
                    LoadOutcome::Rejected {
                        reason: err.to_string(),
                    }
                }
            };
            models.outcomes.insert(stream, outcome);
        }

        info!(
            loaded = models.loaded_count(),
            fallback = models.fallback_count(),
            "Model loading finished"
        );

        models
    }

    fn load_stream(
        &self,
        stream: RevenueStream,
        path: &Path,
    ) -> Result<(ModelHandle, DecodeMode), ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (model, mode) = match decode_artifact(&bytes, DecodeMode::Strict) {
            Ok(model) => (model, DecodeMode::Strict),
            Err(strict_err) => {
                debug!(stream = %stream, error = %strict_err, "Strict decode failed, retrying in legacy mode");
                (decode_artifact(&bytes, DecodeMode::Legacy)?, DecodeMode::Legacy)
            }
        };

        let handle = ModelHandle::new(
            stream,
            model,
            self.config.scenario.elasticity(stream),
            self.config.scenario.base_value(stream),
        );

        Ok((handle, mode))
    }
}
