use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::classifier::{Classifier, ClassifierError, CHECKSUM_FILE, MODEL_FILE};

/// Environment variable overriding the model base directory.
pub const MODEL_DIR_ENV: &str = "FALLDETECTOR_MODEL_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("No exported model found in {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed for {}", .0.display())]
    VerificationFailed(PathBuf),
    #[error("{0}")]
    Classifier(#[from] ClassifierError),
}

/// Manages the timestamped model exports below one base directory.
///
/// Every export lands in its own `<base>/<unix-seconds>` directory, so
/// re-training never overwrites a model a daemon may be loading.
#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        Self::resolve_models_dir(env::var_os(MODEL_DIR_ENV).map(PathBuf::from))
    }

    /// Picks the models directory given the value of [`MODEL_DIR_ENV`], if set.
    fn resolve_models_dir(env_dir: Option<PathBuf>) -> PathBuf {
        // 1. Environment override
        if let Some(path) = env_dir {
            return path.join("trained");
        }

        // 2. Next to the working directory
        if let Ok(cwd) = env::current_dir() {
            return cwd.join("falldetector_model").join("trained");
        }

        // 3. If all else fails, use system temp directory
        env::temp_dir().join("falldetector_model").join("trained")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Lists complete exports, oldest first.
    pub fn list_exports(&self) -> Result<Vec<PathBuf>, ModelError> {
        let mut versions: Vec<(u64, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.models_dir)? {
            let entry = entry?;
            let path = entry.path();
            let version = match entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) {
                Some(v) => v,
                None => continue,
            };
            if path.join(MODEL_FILE).is_file() {
                versions.push((version, path));
            }
        }
        versions.sort_by_key(|(v, _)| *v);
        Ok(versions.into_iter().map(|(_, p)| p).collect())
    }

    pub fn latest_export(&self) -> Result<Option<PathBuf>, ModelError> {
        Ok(self.list_exports()?.pop())
    }

    /// Exports `classifier` into a fresh version directory and returns its path.
    ///
    /// The model is written to a staging directory first and renamed into
    /// place, so a partially written export is never listed.
    pub fn export(&self, classifier: &Classifier) -> Result<PathBuf, ModelError> {
        let mut version = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        while self.models_dir.join(version.to_string()).exists() {
            version += 1;
        }

        let staging = self.models_dir.join(format!(".staging-{}", version));
        let target = self.models_dir.join(version.to_string());
        log::info!("Exporting model to {:?}", target);

        if let Err(e) = classifier.export(&staging) {
            log::error!("Failed to write model export: {}", e);
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }
        fs::rename(&staging, &target)?;

        if !self.verify_export(&target)? {
            let _ = fs::remove_dir_all(&target);
            return Err(ModelError::VerificationFailed(target));
        }
        Ok(target)
    }

    /// Recomputes the checksum of an export and compares it with the stored one.
    /// Missing files verify as `false`.
    pub fn verify_export(&self, dir: &Path) -> Result<bool, ModelError> {
        let model_path = dir.join(MODEL_FILE);
        let checksum_path = dir.join(CHECKSUM_FILE);
        log::debug!("Verifying export at {:?}", dir);

        if !model_path.exists() || !checksum_path.exists() {
            log::info!("One or both export files do not exist in {:?}", dir);
            return Ok(false);
        }

        let bytes = fs::read(&model_path)?;
        let expected = fs::read_to_string(&checksum_path)?;
        let actual = crate::classifier::model_checksum(&bytes);
        log::debug!("Calculated hash: {}", actual);
        log::debug!("Expected hash:   {}", expected.trim());
        Ok(actual == expected.trim())
    }

    /// Loads the most recent export.
    ///
    /// # Errors
    /// - `NotFound` if no export exists
    /// - `Classifier(ModelLoadError)` if the export fails to load
    pub fn load_latest(&self) -> Result<Classifier, ModelError> {
        let latest = self
            .latest_export()?
            .ok_or_else(|| ModelError::NotFound(self.models_dir.clone()))?;
        Ok(Classifier::load(latest)?)
    }

    pub fn remove_export(&self, dir: &Path) -> Result<(), ModelError> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
