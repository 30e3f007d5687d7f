mod common;

use std::fs;

use falldetector::classifier::{CHECKSUM_FILE, MODEL_FILE};
use falldetector::{Classifier, ModelError, ModelManager};

use common::{held_out_samples, training_samples};

fn small_classifier() -> Classifier {
    Classifier::builder()
        .with_steps(50)
        .and_then(|b| b.fit(&training_samples()))
        .expect("fit")
}

#[test]
fn test_export_and_load_latest() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let manager = ModelManager::new(dir.path().join("trained"))?;
    let classifier = small_classifier();

    let export = manager.export(&classifier)?;
    assert!(export.join(MODEL_FILE).is_file());
    assert!(export.join(CHECKSUM_FILE).is_file());
    assert!(export
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.parse::<u64>().is_ok()));

    let loaded = manager.load_latest()?;
    for sample in held_out_samples() {
        assert_eq!(loaded.predict(&sample.features), classifier.predict(&sample.features));
    }
    Ok(())
}

#[test]
fn test_exports_never_overwrite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let manager = ModelManager::new(dir.path())?;
    let classifier = small_classifier();

    let first = manager.export(&classifier)?;
    let second = manager.export(&classifier)?;
    assert_ne!(first, second);
    assert_eq!(manager.list_exports()?, vec![first, second.clone()]);
    assert_eq!(manager.latest_export()?, Some(second));
    Ok(())
}

#[test]
fn test_tampered_export_fails_verification() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let manager = ModelManager::new(dir.path())?;
    let export = manager.export(&small_classifier())?;
    assert!(manager.verify_export(&export)?);

    fs::write(export.join(CHECKSUM_FILE), "0".repeat(64))?;
    assert!(!manager.verify_export(&export)?);
    assert!(matches!(manager.load_latest(), Err(ModelError::Classifier(_))));
    Ok(())
}

#[test]
fn test_remove_export() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let manager = ModelManager::new(dir.path())?;
    let export = manager.export(&small_classifier())?;

    manager.remove_export(&export)?;
    assert!(!export.exists());
    assert!(manager.list_exports()?.is_empty());
    // removing twice is fine
    manager.remove_export(&export)?;
    Ok(())
}
