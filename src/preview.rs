//! Camera check that runs independently of the monitor.
//!
//! Every frame is a separate capture, and the newest one is written to a
//! PNG so it can be opened in any image viewer.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use crate::camera::Camera;
use crate::monitor::sleep_with_cancellation;

#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub output: PathBuf,
    /// Stop after this many capture attempts; `None` runs until stopped.
    pub frames: Option<u64>,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewStats {
    pub captured: u64,
    pub failed: u64,
}

pub fn run_preview(
    camera: &dyn Camera,
    options: &PreviewOptions,
    stop: &AtomicBool,
) -> Result<PreviewStats> {
    info!(
        "Previewing {} into {}",
        camera.describe(),
        options.output.display()
    );

    let mut stats = PreviewStats::default();
    let done = |stats: &PreviewStats| {
        options
            .frames
            .is_some_and(|limit| stats.captured + stats.failed >= limit)
    };

    while !done(&stats) {
        match camera.capture_frame() {
            Ok(frame) => {
                frame.save(&options.output)?;
                stats.captured += 1;
                info!(
                    "frame {}: {}x{}",
                    stats.captured,
                    frame.width(),
                    frame.height()
                );
            }
            Err(err) => {
                stats.failed += 1;
                warn!("Capture failed: {}", err);
            }
        }

        if done(&stats) || sleep_with_cancellation(stop, options.interval) {
            break;
        }
    }

    Ok(stats)
}
