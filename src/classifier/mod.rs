use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Detector, DetectorCreation, HumanReview, ImageFormat};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_WAIT_SECS: f64 = 12.0;
pub const DEFAULT_PATIENCE_SECS: f64 = 12.0;

/// Answer label returned by a binary detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Yes,
    No,
    /// Anything else the service reports, e.g. `UNCLEAR` or a pending placeholder.
    Unresolved(String),
}

impl Label {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "YES" => Label::Yes,
            "NO" => Label::No,
            other => Label::Unresolved(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Yes => "YES",
            Label::No => "NO",
            Label::Unresolved(raw) => raw,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    /// As reported; `None` when a human reviewer supplied the label.
    pub confidence: Option<f64>,
}

impl ClassificationResult {
    pub fn scored(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence: Some(confidence),
        }
    }

    /// Confidence used for threshold checks. Human answers count as certain.
    pub fn effective_confidence(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }
}

/// Name, query and threshold identifying a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSpec {
    pub name: String,
    pub query: String,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

impl DetectorSpec {
    pub fn new(name: impl Into<String>, query: impl Into<String>, confidence_threshold: f64) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            confidence_threshold,
        }
    }

    pub fn creation(&self) -> DetectorCreation<'_> {
        DetectorCreation {
            name: &self.name,
            query: &self.query,
            confidence_threshold: self.confidence_threshold,
        }
    }
}

/// Per-submission knobs forwarded to the service.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// How long to keep polling for a confident answer.
    pub wait: Duration,
    pub patience: Duration,
    pub confidence_threshold: f64,
    pub human_review: HumanReview,
}

impl QueryOptions {
    pub fn new(confidence_threshold: f64, human_review: HumanReview) -> Self {
        Self {
            wait: Duration::from_secs_f64(DEFAULT_WAIT_SECS),
            patience: Duration::from_secs_f64(DEFAULT_PATIENCE_SECS),
            confidence_threshold,
            human_review,
        }
    }
}

/// Image handed to a classifier: a captured frame or a file on disk.
#[derive(Debug, Clone, Copy)]
pub enum ImagePayload<'a> {
    Frame(&'a RgbImage),
    File(&'a Path),
}

impl ImagePayload<'_> {
    /// Frames are sent as JPEG; files are sent as-is with the MIME type of their extension.
    pub fn encode(&self) -> Result<(Vec<u8>, ImageFormat), ApiError> {
        match self {
            ImagePayload::Frame(frame) => {
                let mut buffer = Cursor::new(Vec::new());
                frame
                    .write_to(&mut buffer, image::ImageFormat::Jpeg)
                    .map_err(|e| ApiError::InvalidImage(e.to_string()))?;
                Ok((buffer.into_inner(), ImageFormat::Jpeg))
            }
            ImagePayload::File(path) => {
                let format = ImageFormat::from_path(path).ok_or_else(|| {
                    ApiError::InvalidImage(format!("unsupported image type: {}", path.display()))
                })?;
                let bytes = fs::read(path).map_err(|e| {
                    ApiError::InvalidImage(format!("failed to read {}: {e}", path.display()))
                })?;
                Ok((bytes, format))
            }
        }
    }
}

/// Remote classification seam; the binary uses [`RemoteClassifier`], tests use fakes.
pub trait Classifier {
    /// Resolves the named detector, creating it if needed.
    fn get_or_create_detector(&self, spec: &DetectorSpec) -> Result<Detector, ApiError>;

    /// Submits one image and blocks until an answer is available.
    fn submit(
        &self,
        detector: &Detector,
        image: ImagePayload<'_>,
        options: &QueryOptions,
    ) -> Result<ClassificationResult, ApiError>;
}

mod remote;

pub use remote::RemoteClassifier;
