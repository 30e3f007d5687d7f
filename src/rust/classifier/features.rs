use std::fmt;

use super::error::ClassifierError;

/// Number of features every vector carries.
pub const FEATURE_COUNT: usize = 4;

/// Number of event categories the default classifier distinguishes.
pub const CLASS_COUNT: usize = 4;

/// Feature names in the order they appear in a [`FeatureVector`] and on the wire.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "impact_duration",
    "impact_violence",
    "impact_average",
    "post_impact_average",
];

/// Display name for labels outside the known categories.
pub const UNKNOWN_LABEL_NAME: &str = "Unknown";

/// The four measurements extracted from a single impact event.
///
/// The order is fixed: `impact_duration`, `impact_violence`, `impact_average`,
/// `post_impact_average`. Every value is finite; there are no defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    /// Creates a feature vector from the four named measurements.
    ///
    /// # Errors
    /// - `ValidationError` if any value is NaN or infinite
    pub fn new(
        impact_duration: f32,
        impact_violence: f32,
        impact_average: f32,
        post_impact_average: f32,
    ) -> Result<Self, ClassifierError> {
        Self::from_array([impact_duration, impact_violence, impact_average, post_impact_average])
    }

    pub fn from_array(values: [f32; FEATURE_COUNT]) -> Result<Self, ClassifierError> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::ValidationError(format!(
                "Feature '{}' must be a finite number, got {}",
                FEATURE_NAMES[pos], values[pos]
            )));
        }
        Ok(Self(values))
    }

    pub fn as_array(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    pub fn impact_duration(&self) -> f32 {
        self.0[0]
    }

    pub fn impact_violence(&self) -> f32 {
        self.0[1]
    }

    pub fn impact_average(&self) -> f32 {
        self.0[2]
    }

    pub fn post_impact_average(&self) -> f32 {
        self.0[3]
    }
}

impl TryFrom<&[f32]> for FeatureVector {
    type Error = ClassifierError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        let array: [f32; FEATURE_COUNT] = values.try_into().map_err(|_| {
            ClassifierError::ValidationError(format!(
                "Feature vector must have exactly {} values, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        Self::from_array(array)
    }
}

/// The event categories known to the default classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Fall,
    Jump,
    Walking,
    Bump,
}

impl EventClass {
    pub const ALL: [EventClass; CLASS_COUNT] = [
        EventClass::Fall,
        EventClass::Jump,
        EventClass::Walking,
        EventClass::Bump,
    ];

    pub fn from_index(idx: i64) -> Option<Self> {
        match idx {
            0 => Some(EventClass::Fall),
            1 => Some(EventClass::Jump),
            2 => Some(EventClass::Walking),
            3 => Some(EventClass::Bump),
            _ => None,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            EventClass::Fall => 0,
            EventClass::Jump => 1,
            EventClass::Walking => 2,
            EventClass::Bump => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::Fall => "Fall",
            EventClass::Jump => "Jump",
            EventClass::Walking => "Walking",
            EventClass::Bump => "Bump",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps any integer label to its display name. Total: never fails.
pub fn label_name(label: i64) -> &'static str {
    EventClass::from_index(label)
        .map(|class| class.as_str())
        .unwrap_or(UNKNOWN_LABEL_NAME)
}

/// Integer class code produced by the classifier and sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassLabel(pub u32);

impl ClassLabel {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn event(&self) -> Option<EventClass> {
        EventClass::from_index(i64::from(self.0))
    }

    pub fn name(&self) -> &'static str {
        label_name(i64::from(self.0))
    }
}

impl From<EventClass> for ClassLabel {
    fn from(class: EventClass) -> Self {
        ClassLabel(class.index())
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A feature vector together with its recorded label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: ClassLabel,
}

impl LabeledSample {
    pub fn new(features: FeatureVector, label: impl Into<ClassLabel>) -> Self {
        Self {
            features,
            label: label.into(),
        }
    }
}
