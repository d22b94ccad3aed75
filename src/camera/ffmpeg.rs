use anyhow::{Result, anyhow};
use image::RgbImage;
use std::process::Command;

use super::Camera;

#[cfg(target_os = "macos")]
const INPUT_FORMAT: &str = "avfoundation";
#[cfg(not(target_os = "macos"))]
const INPUT_FORMAT: &str = "v4l2";

/// First video device for the platform's capture layer.
pub fn default_device() -> String {
    if cfg!(target_os = "macos") {
        "0".to_string()
    } else {
        "/dev/video0".to_string()
    }
}

/// Grabs frames by running `ffmpeg` once per capture.
///
/// Each invocation opens the device, reads one frame as PNG on stdout and
/// exits, so nothing holds the camera between polls.
#[derive(Debug, Clone)]
pub struct FfmpegCamera {
    program: String,
    device: String,
}

impl FfmpegCamera {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            program: "ffmpeg".to_string(),
            device: device.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self) -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            INPUT_FORMAT,
            "-i",
            self.device.as_str(),
            "-frames:v",
            "1",
            "-f",
            "image2pipe",
            "-vcodec",
            "png",
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl Camera for FfmpegCamera {
    fn capture_frame(&self) -> Result<RgbImage> {
        let output = Command::new(&self.program)
            .args(self.args())
            .output()
            .map_err(|e| anyhow!("{} not available: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} failed on {}: {}",
                self.program,
                self.device,
                stderr.trim()
            ));
        }
        if output.stdout.is_empty() {
            return Err(anyhow!("no frame received from {}", self.device));
        }

        let frame = image::load_from_memory(&output.stdout)?.to_rgb8();
        log::debug!(
            "Captured {}x{} frame from {}",
            frame.width(),
            frame.height(),
            self.device
        );
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("{} ({} via {})", self.device, INPUT_FORMAT, self.program)
    }
}
