use std::time::Duration;

use crate::capture::scheduler::CaptureOpts;
use crate::encode::ImageFormat;
use crate::foundation::core::{BoundingBox, PixelSize};
use crate::foundation::error::{MapError, MapResult};
use crate::plan::sections::PixelBudget;

/// Everything one export job needs, already converted to device pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExportConfig {
    pub bounds: BoundingBox,
    pub width: u32,
    pub height: u32,
    /// Device pixels per CSS pixel (`dpi / 72`).
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,
    /// Per-section pixel budget. Derived from the renderer's limits when absent.
    #[serde(default)]
    pub max_pixels: Option<u64>,
    #[serde(default)]
    pub format: ImageFormat,
    /// Lossy quality in `(0, 1]`.
    #[serde(default = "default_quality")]
    pub quality: f32,
    #[serde(default = "default_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub frame_timeout_ms: u64,
}

fn default_pixel_ratio() -> f64 {
    2.0
}

fn default_quality() -> f32 {
    0.9
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ExportConfig {
    pub fn new(bounds: BoundingBox, width: u32, height: u32) -> Self {
        Self {
            bounds,
            width,
            height,
            pixel_ratio: default_pixel_ratio(),
            max_pixels: None,
            format: ImageFormat::default(),
            quality: default_quality(),
            settle_timeout_ms: default_timeout_ms(),
            frame_timeout_ms: default_timeout_ms(),
        }
    }

    pub fn validate(&self) -> MapResult<()> {
        self.bounds.validate()?;
        self.size().validate()?;
        if !self.pixel_ratio.is_finite() || self.pixel_ratio <= 0.0 {
            return Err(MapError::configuration(format!(
                "pixel ratio must be positive (got {})",
                self.pixel_ratio
            )));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(MapError::configuration(format!(
                "quality must be within (0, 1] (got {})",
                self.quality
            )));
        }
        if self.max_pixels == Some(0) {
            return Err(MapError::configuration("max_pixels must be non-zero"));
        }
        if self.settle_timeout_ms == 0 || self.frame_timeout_ms == 0 {
            return Err(MapError::configuration("timeouts must be non-zero"));
        }
        Ok(())
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Explicit budget, or the one derived from `max_renderbuffer_size`.
    pub fn budget(&self, max_renderbuffer_size: u32) -> PixelBudget {
        self.max_pixels
            .map(PixelBudget)
            .unwrap_or_else(|| PixelBudget::from_renderbuffer_size(max_renderbuffer_size))
    }

    pub fn capture_opts(&self) -> CaptureOpts {
        CaptureOpts {
            pixel_ratio: self.pixel_ratio,
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
            frame_timeout: Duration::from_millis(self.frame_timeout_ms),
        }
    }
}
