use std::fs;
use std::path::Path;

use log::{debug, error};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ClassifierError;
use super::features::{ClassLabel, FeatureVector, FEATURE_COUNT};
use super::network::FeedForwardNetwork;
use super::utils::argmax;

/// File holding the serialised model inside an export directory.
pub const MODEL_FILE: &str = "model.json";
/// File holding the hex SHA-256 of [`MODEL_FILE`].
pub const CHECKSUM_FILE: &str = "model.sha256";

const FORMAT_VERSION: u32 = 1;

/// Everything `fit` learns. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TrainedModel {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
    pub feature_mean: Array1<f32>,
    pub feature_std: Array1<f32>,
    pub network: FeedForwardNetwork,
    pub training_steps: usize,
    pub final_loss: f32,
}

impl TrainedModel {
    pub fn new(
        feature_names: Vec<String>,
        class_names: Vec<String>,
        feature_mean: Array1<f32>,
        feature_std: Array1<f32>,
        network: FeedForwardNetwork,
        training_steps: usize,
        final_loss: f32,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            feature_names,
            class_names,
            feature_mean,
            feature_std,
            network,
            training_steps,
            final_loss,
        }
    }

    /// Scales raw feature rows with the statistics captured at training time.
    pub fn standardize(&self, data: &Array2<f32>) -> Array2<f32> {
        (data - &self.feature_mean) / &self.feature_std
    }

    pub fn predict(&self, features: &FeatureVector) -> ClassLabel {
        let raw = features.as_array();
        let row = Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| raw[j]);
        let logits = self.network.forward(&self.standardize(&row));
        ClassLabel(argmax(logits.row(0)) as u32)
    }

    /// Checks internal consistency; a model that passes always predicts in range.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ClassifierError::ModelLoadError(format!(
                "Unsupported model format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }
        self.network
            .check_shapes()
            .map_err(|e| ClassifierError::ModelLoadError(format!("Invalid network: {}", e)))?;

        let inputs = self.network.input_size();
        if inputs != FEATURE_COUNT || self.feature_names.len() != FEATURE_COUNT {
            return Err(ClassifierError::ModelLoadError(format!(
                "Model expects {} features ({} named), this build uses {}",
                inputs,
                self.feature_names.len(),
                FEATURE_COUNT
            )));
        }
        if self.feature_mean.len() != FEATURE_COUNT || self.feature_std.len() != FEATURE_COUNT {
            return Err(ClassifierError::ModelLoadError(
                "Standardisation statistics do not match the feature count".into(),
            ));
        }
        if self.feature_std.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ClassifierError::ModelLoadError(
                "Standardisation deviations must be positive".into(),
            ));
        }
        if self.class_names.len() != self.network.output_size() {
            return Err(ClassifierError::ModelLoadError(format!(
                "Model has {} outputs but {} class names",
                self.network.output_size(),
                self.class_names.len()
            )));
        }
        Ok(())
    }

    /// Writes `model.json` and its checksum into `dir`, creating it if needed.
    /// Returns the checksum.
    pub fn write_to_dir(&self, dir: &Path) -> Result<String, ClassifierError> {
        fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| ClassifierError::ExportError(format!("Failed to serialise model: {}", e)))?;
        let hash = sha256_hex(&bytes);

        fs::write(dir.join(MODEL_FILE), &bytes)?;
        fs::write(dir.join(CHECKSUM_FILE), format!("{}\n", hash))?;
        debug!("Wrote {} bytes to {:?} (sha256 {})", bytes.len(), dir, hash);
        Ok(hash)
    }

    /// Reads and verifies a model previously written by [`write_to_dir`](Self::write_to_dir).
    pub fn read_from_dir(dir: &Path) -> Result<Self, ClassifierError> {
        let model_path = dir.join(MODEL_FILE);
        let checksum_path = dir.join(CHECKSUM_FILE);
        if !model_path.is_file() {
            return Err(ClassifierError::ModelLoadError(format!(
                "No exported model found at {:?}",
                model_path
            )));
        }

        let bytes = fs::read(&model_path).map_err(|e| {
            ClassifierError::ModelLoadError(format!("Failed to read {:?}: {}", model_path, e))
        })?;
        let expected = fs::read_to_string(&checksum_path).map_err(|e| {
            ClassifierError::ModelLoadError(format!("Failed to read {:?}: {}", checksum_path, e))
        })?;
        let actual = sha256_hex(&bytes);
        if actual != expected.trim() {
            error!("Checksum mismatch for {:?}: expected {}, got {}", model_path, expected.trim(), actual);
            return Err(ClassifierError::ModelLoadError(format!(
                "Checksum mismatch for {:?}",
                model_path
            )));
        }

        let model: TrainedModel = serde_json::from_slice(&bytes).map_err(|e| {
            ClassifierError::ModelLoadError(format!("Failed to parse {:?}: {}", model_path, e))
        })?;
        model.validate()?;
        Ok(model)
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::features::FEATURE_NAMES;
    use tempfile::TempDir;

    fn sample_model() -> TrainedModel {
        TrainedModel::new(
            FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            vec!["a".into(), "b".into(), "c".into()],
            Array1::from_vec(vec![500.0, 0.5, 12.0, 9.8]),
            Array1::from_vec(vec![200.0, 0.2, 3.0, 0.5]),
            FeedForwardNetwork::new(&[4, 6, 3], 11),
            0,
            0.0,
        )
    }

    #[test]
    fn test_write_then_read() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let model = sample_model();
        let hash = model.write_to_dir(dir.path())?;
        assert_eq!(hash.len(), 64);

        let loaded = TrainedModel::read_from_dir(dir.path())?;
        let v = FeatureVector::new(1077.0, 0.49, 10.33, 10.52)?;
        assert_eq!(loaded.predict(&v), model.predict(&v));
        Ok(())
    }

    #[test]
    fn test_tampered_model_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        sample_model().write_to_dir(dir.path())?;
        let path = dir.path().join(MODEL_FILE);
        let mut text = fs::read_to_string(&path)?;
        text.push(' ');
        fs::write(&path, text)?;

        let result = TrainedModel::read_from_dir(dir.path());
        assert!(matches!(result, Err(ClassifierError::ModelLoadError(_))));
        Ok(())
    }

    #[test]
    fn test_missing_dir_is_model_load_error() {
        let result = TrainedModel::read_from_dir(Path::new("/nonexistent/falldetector/export"));
        assert!(matches!(result, Err(ClassifierError::ModelLoadError(_))));
    }

    #[test]
    fn test_validate_rejects_class_mismatch() {
        let mut model = sample_model();
        model.class_names.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_prediction_in_range() -> Result<(), Box<dyn std::error::Error>> {
        let model = sample_model();
        for v in [[0.0, 0.0, 0.0, 0.0], [1e6, -3.0, 50.0, 0.1], [346.0, 0.95, 19.37, 9.89]] {
            let label = model.predict(&FeatureVector::from_array(v)?);
            assert!(label.index() < 3);
        }
        Ok(())
    }
}
