//! Wire format: one JSON object in, one decimal label and a newline out.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use serde_json::Value;

use crate::classifier::{ClassLabel, FeatureVector, FEATURE_NAMES};

/// Why a connection was rejected without a response.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("request has a missing or non-numeric field: {0}")]
    InvalidFields(#[source] serde_json::Error),
    #[error("feature '{name}' is out of range: {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("connection closed before a complete request arrived")]
    Incomplete,
    #[error("no complete request within {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A classification request as sent by sensor clients.
///
/// All four fields are required; unknown extra keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub impact_duration: f64,
    pub impact_violence: f64,
    pub impact_average: f64,
    pub post_impact_average: f64,
}

impl ClassifyRequest {
    /// Tries to parse a complete request from the bytes received so far.
    ///
    /// Returns `Ok(None)` while the buffer holds only a prefix of a JSON object.
    pub fn parse(buf: &[u8]) -> Result<Option<Self>, RequestError> {
        let value = match serde_json::from_slice::<Value>(buf) {
            Ok(value) => value,
            Err(e) => {
                return match e.classify() {
                    Category::Eof => Ok(None),
                    // a number cut off mid-way ("0." or "1e") fails on the last byte
                    Category::Syntax if fails_at_end(buf, &e) && is_unterminated_object(buf) => Ok(None),
                    Category::Data => Err(RequestError::InvalidFields(e)),
                    Category::Syntax | Category::Io => Err(RequestError::Malformed(e)),
                };
            }
        };

        // derived structs also accept sequences; only objects carry named fields
        if !value.is_object() {
            return Err(RequestError::InvalidFields(serde::de::Error::custom(format!(
                "expected a JSON object with fields {:?}",
                FEATURE_NAMES
            ))));
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(RequestError::InvalidFields)
    }

    /// Builds the feature vector in its fixed order.
    pub fn to_features(&self) -> Result<FeatureVector, RequestError> {
        let raw = [
            self.impact_duration,
            self.impact_violence,
            self.impact_average,
            self.post_impact_average,
        ];
        let values = raw.map(|v| v as f32);
        FeatureVector::from_array(values).map_err(|_| {
            let i = values.iter().position(|v| !v.is_finite()).unwrap_or_default();
            RequestError::OutOfRange {
                name: FEATURE_NAMES[i],
                value: raw[i],
            }
        })
    }
}

/// Byte offset a parse error points at.
fn error_offset(buf: &[u8], e: &serde_json::Error) -> usize {
    let line_start = match e.line() {
        0 | 1 => 0,
        line => buf
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'\n')
            .nth(line - 2)
            .map_or(buf.len(), |(i, _)| i + 1),
    };
    line_start + e.column()
}

/// True when the error sits on the last byte received, so more input may still fix it.
fn fails_at_end(buf: &[u8], e: &serde_json::Error) -> bool {
    error_offset(buf, e) + 1 >= buf.len()
}

/// True when `buf` opens a JSON object whose closing brace has not arrived yet.
fn is_unterminated_object(buf: &[u8]) -> bool {
    let mut bytes = buf.iter().skip_while(|b| b.is_ascii_whitespace());
    if bytes.next() != Some(&b'{') {
        return false;
    }

    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    for &b in bytes {
        if in_string {
            match (escaped, b) {
                (true, _) => escaped = false,
                (false, b'\\') => escaped = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

impl From<&FeatureVector> for ClassifyRequest {
    fn from(features: &FeatureVector) -> Self {
        Self {
            impact_duration: f64::from(features.impact_duration()),
            impact_violence: f64::from(features.impact_violence()),
            impact_average: f64::from(features.impact_average()),
            post_impact_average: f64::from(features.post_impact_average()),
        }
    }
}

/// Encodes a label as sent back to the client.
pub fn encode_response(label: ClassLabel) -> Vec<u8> {
    format!("{}\n", label).into_bytes()
}

/// Parses one response line. Returns `None` for anything but a decimal label.
pub fn decode_response(line: &str) -> Option<ClassLabel> {
    line.trim_end_matches(['\r', '\n'])
        .parse::<u32>()
        .ok()
        .map(ClassLabel)
}
