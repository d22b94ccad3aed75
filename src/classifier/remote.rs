use std::thread;
use std::time::{Duration, Instant};

use crate::api::{ApiClient, ApiError, Detector, ImageQuery, SubmissionParams};

use super::{ClassificationResult, Classifier, DetectorSpec, ImagePayload, Label, QueryOptions};

const POLL_INITIAL_DELAY: Duration = Duration::from_millis(500);
const POLL_DELAY_MULTIPLIER: f64 = 1.5;
const POLL_MAX_DELAY: Duration = Duration::from_secs(10);
const PENDING_LABEL: &str = "PENDING";

/// Classifier backed by the Groundlight image-query API.
pub struct RemoteClassifier {
    api: ApiClient,
}

impl RemoteClassifier {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl Classifier for RemoteClassifier {
    fn get_or_create_detector(&self, spec: &DetectorSpec) -> Result<Detector, ApiError> {
        let detector = self.api.get_or_create_detector(&spec.creation())?;
        log::info!(
            "Using detector `{}` ({}) at threshold {:.2}",
            detector.name,
            detector.id,
            detector.confidence_threshold
        );
        Ok(detector)
    }

    fn submit(
        &self,
        detector: &Detector,
        image: ImagePayload<'_>,
        options: &QueryOptions,
    ) -> Result<ClassificationResult, ApiError> {
        let (bytes, format) = image.encode()?;
        let params = SubmissionParams {
            patience_time: options.patience.as_secs_f64(),
            confidence_threshold: options.confidence_threshold,
            human_review: options.human_review,
        };

        let deadline = Instant::now() + options.wait;
        let mut query = self
            .api
            .submit_image_query(&detector.id, bytes, format, &params)?;
        log::debug!("Submitted image query {}", query.id);

        let mut delay = POLL_INITIAL_DELAY;
        while !is_confident(&query, options.confidence_threshold) {
            let now = Instant::now();
            if now >= deadline {
                log::debug!("Wait window elapsed for {}", query.id);
                break;
            }
            thread::sleep(delay.min(deadline - now));
            query = self.api.get_image_query(&query.id)?;
            delay = next_poll_delay(delay);
        }

        Ok(result_of(&query))
    }
}

// A missing confidence means a human answered, which the service treats as certain.
fn is_confident(query: &ImageQuery, threshold: f64) -> bool {
    query
        .result
        .as_ref()
        .is_some_and(|r| r.confidence.unwrap_or(1.0) >= threshold)
}

fn next_poll_delay(current: Duration) -> Duration {
    current.mul_f64(POLL_DELAY_MULTIPLIER).min(POLL_MAX_DELAY)
}

fn result_of(query: &ImageQuery) -> ClassificationResult {
    match &query.result {
        Some(result) => ClassificationResult {
            label: Label::parse(&result.label),
            confidence: result.confidence,
        },
        None => ClassificationResult::scored(Label::Unresolved(PENDING_LABEL.to_string()), 0.0),
    }
}
