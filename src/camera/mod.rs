use anyhow::Result;
use clap::ValueEnum;
use image::RgbImage;

/// Single-shot frame source. Implementations open the device per call and
/// release it before returning.
pub trait Camera {
    fn capture_frame(&self) -> Result<RgbImage>;

    /// Human-readable device name for logs.
    fn describe(&self) -> String;
}

/// Capture implementation selected on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraBackend {
    #[default]
    Ffmpeg,
    /// Requires the `opencv` feature; the device is a numeric index.
    Opencv,
}

/// Builds the camera for `backend`; `device` falls back to the platform default.
pub fn open_camera(backend: CameraBackend, device: Option<String>) -> Result<Box<dyn Camera>> {
    match backend {
        CameraBackend::Ffmpeg => Ok(Box::new(FfmpegCamera::new(
            device.unwrap_or_else(default_device),
        ))),
        #[cfg(feature = "opencv")]
        CameraBackend::Opencv => {
            let index = match device {
                Some(device) => device
                    .parse::<i32>()
                    .map_err(|_| anyhow::anyhow!("opencv device must be an index, got `{device}`"))?,
                None => 0,
            };
            Ok(Box::new(OpenCvCamera::new(index)))
        }
        #[cfg(not(feature = "opencv"))]
        CameraBackend::Opencv => Err(anyhow::anyhow!(
            "this build does not include the `opencv` feature"
        )),
    }
}

/// Reorders packed BGR bytes into an RGB image.
pub fn bgr_to_rgb(width: u32, height: u32, bgr: &[u8]) -> Option<RgbImage> {
    let expected = (width as usize) * (height as usize) * 3;
    if width == 0 || height == 0 || bgr.len() != expected {
        return None;
    }

    let mut rgb = Vec::with_capacity(expected);
    for pixel in bgr.chunks_exact(3) {
        rgb.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
    }
    RgbImage::from_raw(width, height, rgb)
}

mod ffmpeg;
#[cfg(feature = "opencv")]
mod opencv_capture;

pub use ffmpeg::{FfmpegCamera, default_device};
#[cfg(feature = "opencv")]
pub use opencv_capture::OpenCvCamera;
