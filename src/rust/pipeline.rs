use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::classifier::{
    ClassLabel, Classifier, ClassifierBuilder, ClassifierError, EventClass, FeatureVector,
};
use crate::config::TrainingConfig;
use crate::dataset::{load_csv_with_header, Dataset};
use crate::model_manager::{ModelError, ModelManager};

/// Illustrative vectors predicted after every run, with the class each one
/// is known to belong to.
pub const EXAMPLE_VECTORS: [([f32; 4], EventClass); 2] = [
    ([1077.0, 0.49, 10.33, 10.52], EventClass::Walking),
    ([346.0, 0.95, 19.37, 9.89], EventClass::Fall),
];

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{} data file does not exist: {}", .kind, .path.display())]
    MissingDataFile { kind: &'static str, path: PathBuf },
    #[error("{0}")]
    Classifier(#[from] ClassifierError),
    #[error("{0}")]
    Model(#[from] ModelError),
}

/// Prediction for one of the [`EXAMPLE_VECTORS`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExamplePrediction {
    pub features: FeatureVector,
    pub predicted: ClassLabel,
    pub reference: EventClass,
}

/// Outcome of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub training_samples: usize,
    pub test_samples: usize,
    /// Accuracy on the test set
    pub accuracy: f64,
    pub final_loss: f32,
    pub examples: Vec<ExamplePrediction>,
    /// Directory the model was exported to
    pub export_dir: PathBuf,
    pub elapsed: Duration,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.6}", self.accuracy)?;
        writeln!(f, " ************* Examples of classification *************")?;
        let predicted: Vec<&str> = self.examples.iter().map(|e| e.predicted.name()).collect();
        let reference: Vec<&str> = self.examples.iter().map(|e| e.reference.as_str()).collect();
        writeln!(f, "Prediction: \t{:?}", predicted)?;
        writeln!(f, "Output: \t{:?}", reference)?;
        write!(f, "Model exported to {}", self.export_dir.display())
    }
}

/// One offline training run: load, fit, evaluate, export.
///
/// Nothing is written until the model has been fitted and evaluated, so a
/// failed run leaves no export behind.
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn run(&self) -> Result<TrainingReport, PipelineError> {
        let start = Instant::now();
        check_exists("training", &self.config.training_data)?;
        check_exists("test", &self.config.test_data)?;

        let training = load_csv_with_header(&self.config.training_data)?;
        let test = load_csv_with_header(&self.config.test_data)?;

        let classifier = self.builder(&training)?.fit(&training.samples)?;
        let accuracy = classifier.evaluate(&test.samples);
        info!("Accuracy on {} test samples: {:.6}", test.len(), accuracy);

        let examples = predict_examples(&classifier)?;
        for example in &examples {
            info!(
                "Example {:?}: predicted {}, reference {}",
                example.features.as_array(),
                example.predicted.name(),
                example.reference
            );
        }

        let manager = ModelManager::new(&self.config.models_dir).map_err(ModelError::from)?;
        let export_dir = manager.export(&classifier).map_err(|e| {
            error!("Failed to export model: {}", e);
            e
        })?;
        info!("Model exported to {:?}", export_dir);

        Ok(TrainingReport {
            training_samples: training.len(),
            test_samples: test.len(),
            accuracy,
            final_loss: classifier.info().final_loss,
            examples,
            export_dir,
            elapsed: start.elapsed(),
        })
    }

    fn builder(&self, training: &Dataset) -> Result<ClassifierBuilder, ClassifierError> {
        let mut builder = Classifier::builder()
            .with_hidden_units(self.config.hidden_units.clone())?
            .with_steps(self.config.steps)?
            .with_learning_rate(self.config.learning_rate)?
            .with_seed(self.config.seed);

        if !training.class_names.is_empty() {
            match builder.clone().with_class_names(training.class_names.clone()) {
                Ok(named) => builder = named,
                Err(e) => warn!("Ignoring class names from the training header: {}", e),
            }
        }
        Ok(builder)
    }
}

fn check_exists(kind: &'static str, path: &Path) -> Result<(), PipelineError> {
    if !path.exists() {
        error!("{} data file does not exist: {:?}", kind, path);
        return Err(PipelineError::MissingDataFile {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn predict_examples(classifier: &Classifier) -> Result<Vec<ExamplePrediction>, ClassifierError> {
    EXAMPLE_VECTORS
        .iter()
        .map(|&(values, reference)| {
            let features = FeatureVector::from_array(values)?;
            Ok(ExamplePrediction {
                predicted: classifier.predict(&features),
                features,
                reference,
            })
        })
        .collect()
}
