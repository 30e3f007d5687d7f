//! Labeled sample files.
//!
//! The format is a CSV file whose first row is a header declaring the sample
//! count and the feature count, optionally followed by class names. Each data
//! row holds the features followed by an integer label:
//!
//! ```csv
//! 3,4,Fall,Jump,Walking,Bump
//! 1077,0.49,10.33,10.52,2
//! 346,0.95,19.37,9.89,0
//! 412,0.81,18.02,9.70,1
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::info;

use crate::classifier::{ClassLabel, ClassifierError, FeatureVector, LabeledSample, FEATURE_COUNT};

/// Samples read from a header-prefixed CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub samples: Vec<LabeledSample>,
    /// Class names listed in the header, empty when the header has none
    pub class_names: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn data_error(line: Option<u64>, msg: impl std::fmt::Display) -> ClassifierError {
    match line {
        Some(line) => ClassifierError::TrainingDataError(format!("line {}: {}", line, msg)),
        None => ClassifierError::TrainingDataError(msg.to_string()),
    }
}

fn record_line(record: &StringRecord) -> Option<u64> {
    record.position().map(|p| p.line())
}

fn parse_header(record: &StringRecord) -> Result<(usize, Vec<String>), ClassifierError> {
    let line = record_line(record);
    let field = |i: usize, what: &str| -> Result<usize, ClassifierError> {
        record
            .get(i)
            .ok_or_else(|| data_error(line, format!("header is missing the {}", what)))?
            .parse::<usize>()
            .map_err(|e| data_error(line, format!("invalid {} in header: {}", what, e)))
    };

    let declared_samples = field(0, "sample count")?;
    let declared_features = field(1, "feature count")?;
    if declared_features != FEATURE_COUNT {
        return Err(data_error(
            line,
            format!(
                "header declares {} features, expected {}",
                declared_features, FEATURE_COUNT
            ),
        ));
    }
    let class_names = record.iter().skip(2).map(str::to_string).collect();
    Ok((declared_samples, class_names))
}

fn parse_sample(record: &StringRecord) -> Result<LabeledSample, ClassifierError> {
    let line = record_line(record);
    if record.len() != FEATURE_COUNT + 1 {
        return Err(data_error(
            line,
            format!(
                "expected {} features and a label, found {} columns",
                FEATURE_COUNT,
                record.len()
            ),
        ));
    }

    let mut values = [0.0f32; FEATURE_COUNT];
    for (i, value) in values.iter_mut().enumerate() {
        *value = record[i]
            .parse::<f32>()
            .map_err(|e| data_error(line, format!("column {}: {}", i + 1, e)))?;
    }
    let features = FeatureVector::from_array(values).map_err(|e| data_error(line, e))?;

    let label = record[FEATURE_COUNT]
        .parse::<u32>()
        .map_err(|e| data_error(line, format!("invalid label '{}': {}", &record[FEATURE_COUNT], e)))?;

    Ok(LabeledSample::new(features, ClassLabel(label)))
}

/// Parses a header-prefixed sample file from any reader.
///
/// # Errors
/// - `TrainingDataError` if the header is missing or malformed, a row is
///   malformed, or the number of rows differs from the declared count
pub fn read_csv_with_header<R: Read>(reader: R) -> Result<Dataset, ClassifierError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = records
        .next()
        .ok_or_else(|| data_error(None, "file is empty, expected a header row"))?
        .map_err(|e| data_error(None, e))?;
    let (declared_samples, class_names) = parse_header(&header)?;

    let mut samples = Vec::with_capacity(declared_samples);
    for record in records {
        let record = record.map_err(|e| data_error(None, e))?;
        samples.push(parse_sample(&record)?);
    }

    if samples.len() != declared_samples {
        return Err(data_error(
            None,
            format!(
                "header declares {} samples but the file has {}",
                declared_samples,
                samples.len()
            ),
        ));
    }

    Ok(Dataset {
        samples,
        class_names,
    })
}

/// Loads a header-prefixed sample file.
///
/// # Errors
/// - `MissingDataFile` if `path` does not exist
/// - `TrainingDataError` for any content problem
pub fn load_csv_with_header<P: AsRef<Path>>(path: P) -> Result<Dataset, ClassifierError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ClassifierError::MissingDataFile(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let dataset = read_csv_with_header(file).map_err(|e| match e {
        ClassifierError::TrainingDataError(msg) => {
            ClassifierError::TrainingDataError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    info!("Loaded {} samples from {:?}", dataset.len(), path);
    Ok(dataset)
}

/// Writes samples in the format [`read_csv_with_header`] accepts.
pub fn write_csv_with_header<W: Write>(
    samples: &[LabeledSample],
    class_names: &[&str],
    writer: W,
) -> Result<(), ClassifierError> {
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);
    let to_err = |e: csv::Error| ClassifierError::TrainingDataError(e.to_string());

    let mut header = vec![samples.len().to_string(), FEATURE_COUNT.to_string()];
    header.extend(class_names.iter().map(|s| s.to_string()));
    csv_writer.write_record(&header).map_err(to_err)?;

    for sample in samples {
        let mut row: Vec<String> = sample.features.as_array().iter().map(|v| v.to_string()).collect();
        row.push(sample.label.to_string());
        csv_writer.write_record(&row).map_err(to_err)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::EventClass;

    #[test]
    fn test_read_with_class_names() -> Result<(), ClassifierError> {
        let data = "2,4,Fall,Jump,Walking,Bump\n1077,0.49,10.33,10.52,2\n346, 0.95, 19.37, 9.89, 0\n";
        let dataset = read_csv_with_header(data.as_bytes())?;
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.class_names, vec!["Fall", "Jump", "Walking", "Bump"]);
        assert_eq!(dataset.samples[0].label, ClassLabel(2));
        assert_eq!(dataset.samples[1].features.impact_duration(), 346.0);
        assert_eq!(dataset.samples[1].label, EventClass::Fall.into());
        Ok(())
    }

    #[test]
    fn test_read_without_class_names() -> Result<(), ClassifierError> {
        let dataset = read_csv_with_header("1,4\n1,2,3,4,3\n".as_bytes())?;
        assert!(dataset.class_names.is_empty());
        assert_eq!(dataset.samples[0].label, ClassLabel(3));
        Ok(())
    }

    #[test]
    fn test_row_count_must_match_header() {
        let result = read_csv_with_header("3,4\n1,2,3,4,0\n".as_bytes());
        assert!(matches!(result, Err(ClassifierError::TrainingDataError(_))));
    }

    #[test]
    fn test_feature_count_must_be_four() {
        assert!(read_csv_with_header("1,3\n1,2,3,0\n".as_bytes()).is_err());
    }

    #[test]
    fn test_malformed_rows_rejected() {
        // missing column
        assert!(read_csv_with_header("1,4\n1,2,3,0\n".as_bytes()).is_err());
        // non-numeric feature
        assert!(read_csv_with_header("1,4\n1,abc,3,4,0\n".as_bytes()).is_err());
        // non-finite feature
        assert!(read_csv_with_header("1,4\n1,NaN,3,4,0\n".as_bytes()).is_err());
        // negative label
        assert!(read_csv_with_header("1,4\n1,2,3,4,-1\n".as_bytes()).is_err());
        // empty input
        assert!(read_csv_with_header("".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = load_csv_with_header("/nonexistent/training.csv");
        assert!(matches!(result, Err(ClassifierError::MissingDataFile(_))));
    }

    #[test]
    fn test_write_then_read() -> Result<(), ClassifierError> {
        let samples = vec![
            LabeledSample::new(FeatureVector::new(1077.0, 0.49, 10.33, 10.52)?, EventClass::Walking),
            LabeledSample::new(FeatureVector::new(346.0, 0.95, 19.37, 9.89)?, EventClass::Fall),
        ];
        let mut buf = Vec::new();
        write_csv_with_header(&samples, &["Fall", "Jump", "Walking", "Bump"], &mut buf)?;
        let dataset = read_csv_with_header(buf.as_slice())?;
        assert_eq!(dataset.samples, samples);
        Ok(())
    }
}
