use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};
use ndarray::Array2;

use super::classifier::Classifier;
use super::error::ClassifierError;
use super::features::{EventClass, LabeledSample, FEATURE_COUNT, FEATURE_NAMES};
use super::model::TrainedModel;
use super::network::{Adagrad, FeedForwardNetwork};
use super::utils::column_stats;

/// Hidden layer widths used unless overridden.
pub const DEFAULT_HIDDEN_UNITS: [usize; 3] = [10, 20, 10];
/// Full-batch training steps used unless overridden.
pub const DEFAULT_STEPS: usize = 2000;
pub const DEFAULT_LEARNING_RATE: f32 = 0.1;
pub const DEFAULT_SEED: u64 = 42;

/// A builder for configuring and fitting a [`Classifier`] with a fluent interface.
///
/// # Example
/// ```no_run
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use falldetector::{Classifier, EventClass, FeatureVector, LabeledSample};
///
/// let samples = vec![
///     LabeledSample::new(FeatureVector::new(1200.0, 0.85, 17.0, 9.8)?, EventClass::Fall),
///     LabeledSample::new(FeatureVector::new(350.0, 0.95, 21.0, 9.9)?, EventClass::Jump),
/// ];
/// let classifier = Classifier::builder()
///     .with_steps(500)?
///     .fit(&samples)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClassifierBuilder {
    hidden_units: Vec<usize>,
    class_names: Vec<String>,
    steps: usize,
    learning_rate: f32,
    seed: u64,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a builder for the default fall-detector configuration:
    /// hidden units `[10, 20, 10]` and the four [`EventClass`] categories.
    pub fn new() -> Self {
        Self {
            hidden_units: DEFAULT_HIDDEN_UNITS.to_vec(),
            class_names: EventClass::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            steps: DEFAULT_STEPS,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the hidden layer widths.
    ///
    /// # Errors
    /// - `ValidationError` if no layer is given or any layer is empty or wider than 1024 units
    pub fn with_hidden_units(mut self, hidden_units: Vec<usize>) -> Result<Self, ClassifierError> {
        const MAX_UNITS: usize = 1024;

        if hidden_units.is_empty() {
            return Err(ClassifierError::ValidationError(
                "At least one hidden layer is required".into(),
            ));
        }
        if let Some(pos) = hidden_units.iter().position(|&u| u == 0 || u > MAX_UNITS) {
            return Err(ClassifierError::ValidationError(format!(
                "Hidden layer {} must have between 1 and {} units, got {}",
                pos + 1,
                MAX_UNITS,
                hidden_units[pos]
            )));
        }
        self.hidden_units = hidden_units;
        Ok(self)
    }

    /// Replaces the class names; labels are their positions in this list.
    ///
    /// # Errors
    /// - `ValidationError` if fewer than two names are given, or any is empty or duplicated
    pub fn with_class_names(mut self, names: Vec<impl Into<String>>) -> Result<Self, ClassifierError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() < 2 {
            return Err(ClassifierError::ValidationError(
                "At least two classes are required".into(),
            ));
        }
        if let Some(pos) = names.iter().position(|n| n.is_empty()) {
            return Err(ClassifierError::ValidationError(format!(
                "Class name {} cannot be empty",
                pos
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(ClassifierError::ValidationError(format!(
                "Duplicate class name '{}'",
                dup
            )));
        }
        self.class_names = names;
        Ok(self)
    }

    pub fn with_steps(mut self, steps: usize) -> Result<Self, ClassifierError> {
        if steps == 0 {
            return Err(ClassifierError::ValidationError(
                "Training needs at least one step".into(),
            ));
        }
        self.steps = steps;
        Ok(self)
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Result<Self, ClassifierError> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(ClassifierError::ValidationError(format!(
                "Learning rate must be a positive number, got {}",
                learning_rate
            )));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    /// Seeds weight initialisation. Identical seeds and samples give identical models.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate_samples(&self, samples: &[LabeledSample]) -> Result<(), ClassifierError> {
        if samples.is_empty() {
            return Err(ClassifierError::TrainingDataError(
                "Cannot fit a classifier on an empty sample set".into(),
            ));
        }
        let class_count = self.class_names.len();
        if let Some(pos) = samples.iter().position(|s| s.label.index() >= class_count) {
            return Err(ClassifierError::TrainingDataError(format!(
                "Sample {} has label {} but only {} classes are configured",
                pos + 1,
                samples[pos].label,
                class_count
            )));
        }
        Ok(())
    }

    /// Fits a brand-new classifier on `samples`.
    ///
    /// # Errors
    /// - `TrainingDataError` if `samples` is empty or a label is out of range
    /// - `BuildError` if training diverges
    pub fn fit(self, samples: &[LabeledSample]) -> Result<Classifier, ClassifierError> {
        self.validate_samples(samples)?;

        let class_count = self.class_names.len();
        let raw = Array2::from_shape_fn((samples.len(), FEATURE_COUNT), |(i, j)| {
            samples[i].features.as_array()[j]
        });
        let targets = Array2::from_shape_fn((samples.len(), class_count), |(i, j)| {
            if samples[i].label.index() == j {
                1.0
            } else {
                0.0
            }
        });

        let (mean, std) = column_stats(&raw);
        let inputs = (&raw - &mean) / &std;

        let mut layer_sizes = Vec::with_capacity(self.hidden_units.len() + 2);
        layer_sizes.push(FEATURE_COUNT);
        layer_sizes.extend_from_slice(&self.hidden_units);
        layer_sizes.push(class_count);

        info!(
            "Fitting classifier on {} samples: layers {:?}, {} steps, learning rate {}",
            samples.len(),
            layer_sizes,
            self.steps,
            self.learning_rate
        );

        let mut network = FeedForwardNetwork::new(&layer_sizes, self.seed);
        let mut optimizer = Adagrad::new(self.learning_rate, &network);
        let log_every = (self.steps / 10).max(1);
        let mut loss = f32::NAN;
        for step in 0..self.steps {
            loss = network.train_step(&inputs, &targets, &mut optimizer);
            if !loss.is_finite() {
                return Err(ClassifierError::BuildError(format!(
                    "Training diverged at step {} (loss {})",
                    step, loss
                )));
            }
            if step % log_every == 0 {
                debug!("step {}: loss {:.5}", step, loss);
            }
        }
        info!("Training finished after {} steps, loss {:.5}", self.steps, loss);

        let model = TrainedModel::new(
            FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            self.class_names,
            mean,
            std,
            network,
            self.steps,
            loss,
        );
        Ok(Classifier::from_model(Arc::new(model), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::features::{ClassLabel, FeatureVector};

    fn two_samples() -> Vec<LabeledSample> {
        vec![
            LabeledSample::new(FeatureVector::new(1200.0, 0.85, 17.0, 9.8).unwrap(), EventClass::Fall),
            LabeledSample::new(FeatureVector::new(350.0, 0.95, 21.0, 9.9).unwrap(), EventClass::Jump),
        ]
    }

    #[test]
    fn test_empty_samples_rejected() {
        let result = ClassifierBuilder::new().fit(&[]);
        assert!(matches!(result, Err(ClassifierError::TrainingDataError(_))));
    }

    #[test]
    fn test_out_of_range_label_rejected() {
        let mut samples = two_samples();
        samples[1].label = ClassLabel(4);
        let result = ClassifierBuilder::new().fit(&samples);
        assert!(matches!(result, Err(ClassifierError::TrainingDataError(_))));
    }

    #[test]
    fn test_option_validation() {
        assert!(ClassifierBuilder::new().with_hidden_units(vec![]).is_err());
        assert!(ClassifierBuilder::new().with_hidden_units(vec![10, 0]).is_err());
        assert!(ClassifierBuilder::new().with_steps(0).is_err());
        assert!(ClassifierBuilder::new().with_learning_rate(0.0).is_err());
        assert!(ClassifierBuilder::new().with_learning_rate(f32::NAN).is_err());
        assert!(ClassifierBuilder::new().with_class_names(vec!["only"]).is_err());
        assert!(ClassifierBuilder::new().with_class_names(vec!["a", "a"]).is_err());
        assert!(ClassifierBuilder::new().with_class_names(vec!["a", ""]).is_err());
    }

    #[test]
    fn test_default_configuration() {
        let builder = ClassifierBuilder::new();
        assert_eq!(builder.hidden_units, vec![10, 20, 10]);
        assert_eq!(builder.class_names, vec!["Fall", "Jump", "Walking", "Bump"]);
    }

    #[test]
    fn test_fit_is_deterministic() -> Result<(), ClassifierError> {
        let samples = two_samples();
        let a = ClassifierBuilder::new().with_steps(50)?.fit(&samples)?;
        let b = ClassifierBuilder::new().with_steps(50)?.fit(&samples)?;
        assert_eq!(a.info().final_loss, b.info().final_loss);
        Ok(())
    }
}
