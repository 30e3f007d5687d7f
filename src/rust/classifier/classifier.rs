use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use super::builder::ClassifierBuilder;
use super::error::ClassifierError;
use super::features::{ClassLabel, FeatureVector, LabeledSample};
use super::model::TrainedModel;
use super::{ClassifierInfo, Predictor};

/// A thread-safe impact event classifier.
///
/// # Thread Safety
///
/// The trained model sits behind an `Arc` and is never mutated, so a
/// `Classifier` can be cloned cheaply and shared across threads or tasks;
/// `predict` takes `&self` and needs no locking.
///
/// Single-thread usage:
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use falldetector::{Classifier, EventClass, FeatureVector, LabeledSample};
///
/// let samples = vec![
///     LabeledSample::new(FeatureVector::new(1200.0, 0.85, 17.0, 9.8)?, EventClass::Fall),
///     LabeledSample::new(FeatureVector::new(600.0, 0.35, 11.0, 10.4)?, EventClass::Walking),
/// ];
/// let classifier = Classifier::builder().with_steps(100)?.fit(&samples)?;
///
/// let label = classifier.predict(&FeatureVector::new(1077.0, 0.49, 10.33, 10.52)?);
/// println!("{} = {}", label, label.name());
/// # Ok(())
/// # }
/// ```
///
/// Multi-thread usage:
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use falldetector::{Classifier, EventClass, FeatureVector, LabeledSample};
/// use std::sync::Arc;
/// use std::thread;
///
/// let samples = vec![
///     LabeledSample::new(FeatureVector::new(1200.0, 0.85, 17.0, 9.8)?, EventClass::Fall),
///     LabeledSample::new(FeatureVector::new(350.0, 0.95, 21.0, 9.9)?, EventClass::Jump),
/// ];
/// let classifier = Arc::new(Classifier::builder().with_steps(100)?.fit(&samples)?);
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     let v = FeatureVector::new(346.0, 0.95, 19.37, 9.89).unwrap();
///     classifier_clone.predict(&v);
/// }).join().unwrap();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Classifier {
    model: Arc<TrainedModel>,
    source: Option<PathBuf>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }

    /// Fits a classifier with the default configuration.
    pub fn fit(samples: &[LabeledSample]) -> Result<Self, ClassifierError> {
        ClassifierBuilder::new().fit(samples)
    }

    pub(crate) fn from_model(model: Arc<TrainedModel>, source: Option<PathBuf>) -> Self {
        Self { model, source }
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            num_classes: self.model.class_names.len(),
            class_labels: self.model.class_names.clone(),
            feature_names: self.model.feature_names.clone(),
            hidden_units: self.model.network.hidden_units(),
            training_steps: self.model.training_steps,
            final_loss: self.model.final_loss,
            source: self.source.clone(),
        }
    }

    /// Predicts the class of a feature vector.
    ///
    /// Pure: the same vector always yields the same label, and the result is
    /// always below `info().num_classes`.
    pub fn predict(&self, features: &FeatureVector) -> ClassLabel {
        self.model.predict(features)
    }

    /// Fraction of `samples` whose prediction matches the recorded label.
    ///
    /// An empty sample set has nothing to get wrong and scores `1.0`.
    pub fn evaluate(&self, samples: &[LabeledSample]) -> f64 {
        if samples.is_empty() {
            return 1.0;
        }
        let correct = samples
            .iter()
            .filter(|s| self.predict(&s.features) == s.label)
            .count();
        correct as f64 / samples.len() as f64
    }

    /// Writes the trained model into `dir` (created if missing).
    ///
    /// # Errors
    /// - `ExportError` if the model cannot be serialised
    /// - `IoError` if the directory or files cannot be written
    pub fn export<P: AsRef<Path>>(&self, dir: P) -> Result<(), ClassifierError> {
        let dir = dir.as_ref();
        let hash = self.model.write_to_dir(dir)?;
        info!("Exported model to {:?} (sha256 {})", dir, hash);
        Ok(())
    }

    /// Loads a model previously written by [`export`](Self::export).
    ///
    /// # Errors
    /// - `ModelLoadError` if the export is missing, fails its checksum, or does
    ///   not match this build's feature layout
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ClassifierError> {
        let dir = dir.as_ref();
        let model = TrainedModel::read_from_dir(dir)?;
        info!(
            "Loaded model from {:?}: {} classes, hidden units {:?}",
            dir,
            model.class_names.len(),
            model.network.hidden_units()
        );
        Ok(Self::from_model(Arc::new(model), Some(dir.to_path_buf())))
    }
}

impl Predictor for Classifier {
    fn predict(&self, features: &FeatureVector) -> ClassLabel {
        Classifier::predict(self, features)
    }
}
