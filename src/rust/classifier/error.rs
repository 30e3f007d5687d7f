use std::io;
use std::path::PathBuf;

/// Represents the different types of errors that can occur in the event classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The labeled samples handed to `fit` (or read from CSV) are unusable
    #[error("Training data error: {0}")]
    TrainingDataError(String),
    /// A training or test data file does not exist
    #[error("Data file not found: {}", .0.display())]
    MissingDataFile(PathBuf),
    /// Invalid input parameters, such as a malformed feature vector
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// The classifier configuration cannot produce a model
    #[error("Build error: {0}")]
    BuildError(String),
    /// An exported model is missing, unreadable or inconsistent
    #[error("Model load error: {0}")]
    ModelLoadError(String),
    /// Writing a model artifact failed
    #[error("Export error: {0}")]
    ExportError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}
