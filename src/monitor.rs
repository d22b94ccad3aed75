use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{debug, error, info, warn};

use crate::alert::{AlertPlayer, AudioAlert};
use crate::api::Detector;
use crate::camera::Camera;
use crate::classifier::{Classifier, ImagePayload, QueryOptions};
use crate::decision::Decision;

pub const DEFAULT_WAIT_PERIOD_SECS: u64 = 60;
const SLEEP_CHUNK_MS: u64 = 100;

/// What a single poll ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    CaptureFailed,
    QueryFailed(String),
    Decided { decision: Decision, alerted: bool },
}

/// Live-camera loop: capture, classify, decide, sleep.
pub struct Monitor<'a> {
    camera: &'a dyn Camera,
    classifier: &'a dyn Classifier,
    player: &'a dyn AlertPlayer,
    detector: Detector,
    alert: AudioAlert,
    options: QueryOptions,
    wait_period: Duration,
}

impl<'a> Monitor<'a> {
    pub fn new(
        camera: &'a dyn Camera,
        classifier: &'a dyn Classifier,
        player: &'a dyn AlertPlayer,
        detector: Detector,
        alert: AudioAlert,
        options: QueryOptions,
        wait_period: Duration,
    ) -> Self {
        Self {
            camera,
            classifier,
            player,
            detector,
            alert,
            options,
            wait_period,
        }
    }

    /// Polls until `stop` is set. Sleeps `wait_period` after every poll,
    /// so a slow query simply delays the next one.
    pub fn run(&self, stop: &AtomicBool) {
        info!(
            "Monitoring {} with detector `{}` every {}s",
            self.camera.describe(),
            self.detector.name,
            self.wait_period.as_secs()
        );

        while !stop.load(Ordering::Relaxed) {
            self.poll_once();
            if sleep_with_cancellation(stop, self.wait_period) {
                break;
            }
        }
        info!("Monitor stopped");
    }

    pub fn poll_once(&self) -> PollOutcome {
        debug!("poll at {}", Local::now().format("%H:%M:%S"));

        let frame = match self.camera.capture_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Capture from {} failed: {}", self.camera.describe(), err);
                println!("\n*** Failed to capture image. ***");
                return PollOutcome::CaptureFailed;
            }
        };

        let result = match self
            .classifier
            .submit(&self.detector, ImagePayload::Frame(&frame), &self.options)
        {
            Ok(result) => result,
            Err(err) => {
                println!("Error submitting image query: {err}");
                return PollOutcome::QueryFailed(err.to_string());
            }
        };

        let decision = Decision::evaluate(&result, self.options.confidence_threshold);
        println!("{}", decision.message);

        let alerted = decision.verdict.should_alert();
        if alerted {
            if let Err(err) = self.player.play(self.alert.path()) {
                error!("Failed to play {}: {}", self.alert.path().display(), err);
            }
        }

        PollOutcome::Decided { decision, alerted }
    }
}

/// Sleeps in short chunks; returns true once `flag` is set.
pub fn sleep_with_cancellation(flag: &AtomicBool, duration: Duration) -> bool {
    let mut elapsed = Duration::ZERO;
    while elapsed < duration {
        if flag.load(Ordering::Relaxed) {
            return true;
        }
        let remaining = duration - elapsed;
        let step = remaining.min(Duration::from_millis(SLEEP_CHUNK_MS));
        thread::sleep(step);
        elapsed += step;
    }
    flag.load(Ordering::Relaxed)
}
