mod common;

use std::sync::Arc;
use std::thread;

use falldetector::{
    label_name, ClassLabel, Classifier, ClassifierError, EventClass, FeatureVector, LabeledSample,
};

use common::{held_out_samples, init, training_samples};

fn fit_clusters() -> Result<Classifier, ClassifierError> {
    Classifier::builder().with_steps(400)?.fit(&training_samples())
}

#[test]
fn test_learns_separable_clusters() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let classifier = fit_clusters()?;
    let accuracy = classifier.evaluate(&held_out_samples());
    assert!(accuracy >= 0.9, "held-out accuracy {}", accuracy);
    Ok(())
}

#[test]
fn test_predict_is_idempotent_and_in_range() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let classifier = fit_clusters()?;
    let inputs = [
        FeatureVector::new(1077.0, 0.49, 10.33, 10.52)?,
        FeatureVector::new(346.0, 0.95, 19.37, 9.89)?,
        FeatureVector::new(0.0, 0.0, 0.0, 0.0)?,
        FeatureVector::new(-5.0e6, 1.0e6, -3.0e4, 7.0e5)?,
    ];
    for input in &inputs {
        let first = classifier.predict(input);
        assert!(first.index() < 4);
        assert_ne!(first.name(), "Unknown");
        for _ in 0..5 {
            assert_eq!(classifier.predict(input), first);
        }
    }
    Ok(())
}

#[test]
fn test_evaluate_counts_matching_predictions() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let classifier = fit_clusters()?;
    let mut samples = held_out_samples();
    // flip a few labels so the expected accuracy is not trivially 1
    for sample in samples.iter_mut().take(3) {
        let predicted = classifier.predict(&sample.features);
        sample.label = ClassLabel((predicted.0 + 1) % 4);
    }

    let matching = samples
        .iter()
        .filter(|s| classifier.predict(&s.features) == s.label)
        .count();
    assert_eq!(classifier.evaluate(&samples), matching as f64 / samples.len() as f64);
    assert!(classifier.evaluate(&samples) < 1.0);
    Ok(())
}

#[test]
fn test_evaluate_empty_set_is_perfect() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = fit_clusters()?;
    assert_eq!(classifier.evaluate(&[]), 1.0);
    Ok(())
}

#[test]
fn test_export_then_load_predicts_identically() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempfile::TempDir::new()?;
    let classifier = fit_clusters()?;
    classifier.export(dir.path())?;
    let loaded = Classifier::load(dir.path())?;

    for sample in held_out_samples().iter().chain(training_samples().iter()) {
        assert_eq!(loaded.predict(&sample.features), classifier.predict(&sample.features));
    }
    assert_eq!(loaded.info().source.as_deref(), Some(dir.path()));
    assert_eq!(loaded.info().class_labels, classifier.info().class_labels);
    Ok(())
}

#[test]
fn test_load_rejects_tampered_export() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    fit_clusters()?.export(dir.path())?;

    let model_path = dir.path().join(falldetector::classifier::MODEL_FILE);
    let mut contents = std::fs::read_to_string(&model_path)?;
    contents.push(' ');
    std::fs::write(&model_path, contents)?;

    let result = Classifier::load(dir.path());
    assert!(matches!(result, Err(ClassifierError::ModelLoadError(_))));
    Ok(())
}

#[test]
fn test_load_missing_export() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = Classifier::load(dir.path().join("nothing-here"));
    assert!(matches!(result, Err(ClassifierError::ModelLoadError(_))));
}

#[test]
fn test_fit_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
    let a = Classifier::builder().with_steps(50)?.with_seed(7).fit(&training_samples())?;
    let b = Classifier::builder().with_steps(50)?.with_seed(7).fit(&training_samples())?;
    assert_eq!(a.info().final_loss, b.info().final_loss);
    for sample in held_out_samples() {
        assert_eq!(a.predict(&sample.features), b.predict(&sample.features));
    }
    Ok(())
}

#[test]
fn test_fit_rejects_bad_training_data() -> Result<(), Box<dyn std::error::Error>> {
    let empty = Classifier::fit(&[]);
    assert!(matches!(empty, Err(ClassifierError::TrainingDataError(_))));

    let out_of_range = vec![LabeledSample::new(FeatureVector::new(1.0, 2.0, 3.0, 4.0)?, ClassLabel(4))];
    let result = Classifier::builder().with_steps(10)?.fit(&out_of_range);
    assert!(matches!(result, Err(ClassifierError::TrainingDataError(_))));
    Ok(())
}

#[test]
fn test_feature_vector_validation() {
    assert!(FeatureVector::new(f32::NAN, 0.0, 0.0, 0.0).is_err());
    assert!(FeatureVector::new(0.0, f32::INFINITY, 0.0, 0.0).is_err());
    assert!(FeatureVector::try_from(&[1.0f32, 2.0, 3.0][..]).is_err());
    assert!(FeatureVector::try_from(&[1.0f32, 2.0, 3.0, 4.0][..]).is_ok());
}

#[test]
fn test_label_names() {
    let names: Vec<&str> = (0..4).map(label_name).collect();
    assert_eq!(names, vec!["Fall", "Jump", "Walking", "Bump"]);
    assert_eq!(label_name(4), "Unknown");
    assert_eq!(label_name(-1), "Unknown");
    assert_eq!(ClassLabel::from(EventClass::Bump).name(), "Bump");
}

#[test]
fn test_concurrent_predictions() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let classifier = Arc::new(fit_clusters()?);
    let samples = held_out_samples();
    let expected: Vec<ClassLabel> = samples.iter().map(|s| classifier.predict(&s.features)).collect();

    let mut handles = vec![];
    for _ in 0..4 {
        let classifier = Arc::clone(&classifier);
        let samples = samples.clone();
        handles.push(thread::spawn(move || {
            samples
                .iter()
                .map(|s| classifier.predict(&s.features))
                .collect::<Vec<_>>()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
    Ok(())
}
