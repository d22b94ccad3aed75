#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use image::RgbImage;

use ppe_monitor::alert::AlertPlayer;
use ppe_monitor::api::{ApiError, Detector};
use ppe_monitor::camera::Camera;
use ppe_monitor::classifier::{
    ClassificationResult, Classifier, DetectorSpec, ImagePayload, Label, QueryOptions,
};

pub fn detector(spec: &DetectorSpec) -> Detector {
    Detector {
        id: format!("det_{}", spec.name),
        name: spec.name.clone(),
        query: spec.query.clone(),
        confidence_threshold: spec.confidence_threshold,
        patience_time: None,
    }
}

/// Replays canned answers and records what was submitted.
#[derive(Default)]
pub struct FakeClassifier {
    answers: RefCell<VecDeque<Result<ClassificationResult, ApiError>>>,
    pub submissions: RefCell<Vec<String>>,
    pub options_seen: RefCell<Vec<QueryOptions>>,
}

impl FakeClassifier {
    pub fn answering(answers: Vec<Result<ClassificationResult, ApiError>>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            ..Default::default()
        }
    }

    pub fn always(label: &str, confidence: f64, times: usize) -> Self {
        Self::answering(
            (0..times)
                .map(|_| {
                    Ok(ClassificationResult::scored(
                        Label::parse(label),
                        confidence,
                    ))
                })
                .collect(),
        )
    }
}

impl Classifier for FakeClassifier {
    fn get_or_create_detector(&self, spec: &DetectorSpec) -> Result<Detector, ApiError> {
        Ok(detector(spec))
    }

    fn submit(
        &self,
        _detector: &Detector,
        image: ImagePayload<'_>,
        options: &QueryOptions,
    ) -> Result<ClassificationResult, ApiError> {
        let description = match image {
            ImagePayload::Frame(frame) => format!("frame {}x{}", frame.width(), frame.height()),
            ImagePayload::File(path) => path.display().to_string(),
        };
        self.submissions.borrow_mut().push(description);
        self.options_seen.borrow_mut().push(*options);
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::InvalidImage("no canned answer left".into())))
    }
}

/// Camera that yields a tiny frame or fails, and raises `stop` after `limit` captures.
pub struct FakeCamera {
    working: bool,
    limit: usize,
    pub captures: Cell<usize>,
    stop: Arc<AtomicBool>,
}

impl FakeCamera {
    pub fn new(working: bool, limit: usize, stop: Arc<AtomicBool>) -> Self {
        Self {
            working,
            limit,
            captures: Cell::new(0),
            stop,
        }
    }
}

impl Camera for FakeCamera {
    fn capture_frame(&self) -> Result<RgbImage> {
        let n = self.captures.get() + 1;
        self.captures.set(n);
        if n >= self.limit {
            self.stop.store(true, Ordering::Relaxed);
        }
        if !self.working {
            bail!("device busy");
        }
        Ok(RgbImage::from_pixel(2, 2, image::Rgb([0, 128, 255])))
    }

    fn describe(&self) -> String {
        "fake camera".into()
    }
}

#[derive(Default)]
pub struct FakePlayer {
    pub played: RefCell<Vec<PathBuf>>,
    pub fail: bool,
}

impl AlertPlayer for FakePlayer {
    fn play(&self, path: &Path) -> Result<()> {
        self.played.borrow_mut().push(path.to_path_buf());
        if self.fail {
            bail!("no audio device");
        }
        Ok(())
    }
}
