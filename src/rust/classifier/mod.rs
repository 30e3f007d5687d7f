use std::path::PathBuf;

mod error;
mod features;
mod model;
mod network;
pub mod builder;
pub mod classifier;
mod utils;

pub use error::ClassifierError;
pub use classifier::Classifier;
pub use builder::ClassifierBuilder;
pub use features::{
    label_name, ClassLabel, EventClass, FeatureVector, LabeledSample, CLASS_COUNT, FEATURE_COUNT,
    FEATURE_NAMES, UNKNOWN_LABEL_NAME,
};
pub use model::{CHECKSUM_FILE, MODEL_FILE};
pub(crate) use model::sha256_hex as model_checksum;

/// Anything that can map a feature vector to a class label.
///
/// The serving daemon only depends on this trait, so the learner behind it
/// can be swapped without touching the protocol code. Implementations must be
/// pure and safe to call concurrently.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> ClassLabel;
}

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Number of classes the classifier distinguishes
    pub num_classes: usize,
    /// Class names, indexed by label
    pub class_labels: Vec<String>,
    /// Feature names in input order
    pub feature_names: Vec<String>,
    /// Widths of the hidden layers
    pub hidden_units: Vec<usize>,
    /// Number of optimisation steps used in training
    pub training_steps: usize,
    /// Training loss after the last step
    pub final_loss: f32,
    /// Export directory the model was loaded from, if any
    pub source: Option<PathBuf>,
}
