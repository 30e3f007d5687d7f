//! An impact-event classifier for fall detection, with an offline training
//! pipeline and a TCP daemon that serves predictions to sensor devices.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use falldetector::{Classifier, EventClass, FeatureVector, LabeledSample};
//!
//! let samples = vec![
//!     LabeledSample::new(FeatureVector::new(1200.0, 0.85, 17.0, 9.8)?, EventClass::Fall),
//!     LabeledSample::new(FeatureVector::new(350.0, 0.95, 21.0, 9.9)?, EventClass::Jump),
//!     LabeledSample::new(FeatureVector::new(600.0, 0.35, 11.0, 10.4)?, EventClass::Walking),
//!     LabeledSample::new(FeatureVector::new(150.0, 0.55, 14.0, 9.6)?, EventClass::Bump),
//! ];
//!
//! let classifier = Classifier::builder()
//!     .with_steps(200)?
//!     .fit(&samples)?;
//!
//! let label = classifier.predict(&FeatureVector::new(1077.0, 0.49, 10.33, 10.52)?);
//! println!("Predicted class: {} ({})", label, label.name());
//! # Ok(())
//! # }
//! ```
//!
//! # Serving
//!
//! A fitted classifier is exported with [`ModelManager::export`] and served by
//! [`Server`]. The daemon shares one read-only model across all connections:
//!
//! ```no_run
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! use falldetector::{ModelManager, Server, ServerConfig};
//!
//! let manager = ModelManager::new_default()?;
//! let server = Server::with_latest_model(ServerConfig::default(), &manager).await?;
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod client;
pub mod config;
pub mod dataset;
pub mod model_manager;
pub mod pipeline;
pub mod server;

pub use classifier::{
    label_name, ClassLabel, Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo,
    EventClass, FeatureVector, LabeledSample, Predictor,
};
pub use client::{classify_remote, ClientError};
pub use config::{ServerConfig, TrainingConfig};
pub use dataset::{load_csv_with_header, read_csv_with_header, write_csv_with_header, Dataset};
pub use model_manager::{ModelError, ModelManager};
pub use pipeline::{PipelineError, TrainingPipeline, TrainingReport};
pub use server::{RequestError, Server, ServerError};

pub fn init_logger() {
    env_logger::init();
}
