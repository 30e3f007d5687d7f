#![allow(dead_code)]

use std::fs::File;
use std::path::Path;

use env_logger::{Builder, Env};
use falldetector::{
    write_csv_with_header, ClassLabel, EventClass, FeatureVector, LabeledSample, Predictor,
};

pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

/// Typical measurements for each event class.
const CENTERS: [(EventClass, [f32; 4]); 4] = [
    (EventClass::Fall, [1200.0, 0.85, 17.0, 9.8]),
    (EventClass::Jump, [350.0, 0.95, 21.0, 9.9]),
    (EventClass::Walking, [600.0, 0.35, 11.0, 10.4]),
    (EventClass::Bump, [150.0, 0.55, 14.0, 9.6]),
];

/// Well separated clusters around [`CENTERS`], each value jittered by up to 8%.
///
/// Different phases give disjoint but similarly distributed sets.
pub fn clustered_samples(per_class: usize, phase: f32) -> Vec<LabeledSample> {
    let mut samples = Vec::with_capacity(per_class * CENTERS.len());
    for (c, (class, center)) in CENTERS.iter().enumerate() {
        for i in 0..per_class {
            let t = i as f32 * 1.7 + c as f32 * 0.3 + phase;
            let jitter = [
                t.sin(),
                (t * 1.3).cos(),
                (t * 0.7 + 1.0).sin(),
                (t * 2.1).cos(),
            ];
            let mut values = *center;
            for (value, j) in values.iter_mut().zip(jitter) {
                *value *= 1.0 + 0.08 * j;
            }
            samples.push(LabeledSample::new(
                FeatureVector::from_array(values).expect("finite cluster values"),
                *class,
            ));
        }
    }
    samples
}

pub fn training_samples() -> Vec<LabeledSample> {
    clustered_samples(20, 0.0)
}

pub fn held_out_samples() -> Vec<LabeledSample> {
    clustered_samples(5, 0.5)
}

pub fn write_dataset(path: &Path, samples: &[LabeledSample]) {
    let file = File::create(path).expect("create dataset file");
    write_csv_with_header(samples, &["Fall", "Jump", "Walking", "Bump"], file).expect("write dataset");
}

/// Answers Jump for violent impacts and Walking otherwise.
pub struct ThresholdPredictor;

impl Predictor for ThresholdPredictor {
    fn predict(&self, features: &FeatureVector) -> ClassLabel {
        if features.impact_violence() > 0.9 {
            EventClass::Jump.into()
        } else {
            EventClass::Walking.into()
        }
    }
}
