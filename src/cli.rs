use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::alert::DEFAULT_AUDIO_PATH;
use crate::camera::CameraBackend;
use crate::evaluation::EvaluationSet;
use crate::monitor::DEFAULT_WAIT_PERIOD_SECS;

/// Command line interface for the PPE monitor.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "Watch a camera or a folder of images with Groundlight detectors and warn about missing PPE."
)]
pub struct AppArgs {
    /// Config file (defaults to ~/.config/ppe-monitor.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Query the detector with a live camera frame on a fixed interval.
    Monitor {
        /// Audio file to play for warnings (.mp3 or .aac).
        #[arg(long, default_value = DEFAULT_AUDIO_PATH)]
        audio: String,
        /// How long to wait (in seconds) between queries to the detector.
        #[arg(long, default_value_t = DEFAULT_WAIT_PERIOD_SECS)]
        wait: u64,
        /// Capture device; overrides the config file.
        #[arg(long)]
        camera: Option<String>,
        #[arg(long, value_enum, default_value_t = CameraBackend::Ffmpeg)]
        backend: CameraBackend,
    },
    /// Run a detector once over every image of an evaluation set.
    Evaluate {
        /// Which image set to evaluate.
        #[arg(long, value_enum)]
        evaluation: EvaluationSet,
        /// Evaluation target name (built-in: ppe, court).
        #[arg(long, default_value = "ppe")]
        target: String,
        /// Filename pattern; overrides the target's pattern.
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Check the camera by saving captured frames to a PNG.
    Preview {
        /// Capture device; overrides the config file.
        #[arg(long)]
        camera: Option<String>,
        #[arg(long, value_enum, default_value_t = CameraBackend::Ffmpeg)]
        backend: CameraBackend,
        #[arg(long, default_value = "preview.png")]
        output: PathBuf,
        /// Number of frames to capture (runs until killed when omitted).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        frames: Option<u64>,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}
