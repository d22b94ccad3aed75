use anyhow::{Result, anyhow};
use image::RgbImage;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use super::{Camera, bgr_to_rgb};

/// In-process capture through OpenCV. The capture handle lives only for the
/// duration of one `capture_frame` call.
#[derive(Debug, Clone, Copy)]
pub struct OpenCvCamera {
    index: i32,
}

impl OpenCvCamera {
    pub fn new(index: i32) -> Self {
        Self { index }
    }
}

impl Camera for OpenCvCamera {
    fn capture_frame(&self) -> Result<RgbImage> {
        let mut capture = VideoCapture::new(self.index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("camera {} could not be opened", self.index));
        }

        let mut frame = Mat::default();
        let grabbed = capture.read(&mut frame)?;
        capture.release()?;

        let size = frame.size()?;
        if !grabbed || size.width <= 0 || size.height <= 0 {
            return Err(anyhow!("no frame received from camera {}", self.index));
        }

        // OpenCV delivers packed BGR
        bgr_to_rgb(size.width as u32, size.height as u32, frame.data_bytes()?)
            .ok_or_else(|| anyhow!("unexpected frame layout from camera {}", self.index))
    }

    fn describe(&self) -> String {
        format!("camera {} (opencv)", self.index)
    }
}
