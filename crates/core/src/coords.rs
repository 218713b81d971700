//! Pixel ⇄ percentage coordinate conversion for the pitch canvas.
//!
//! The drawing surface reports pointer positions in pixels; everything that
//! is stored or overlap-checked lives in percentage space.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::zone::PITCH_EXTENT;

/// A point in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point in percent of pitch width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates into `[0, 100]`.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, PITCH_EXTENT),
            y: self.y.clamp(0.0, PITCH_EXTENT),
        }
    }
}

/// Current pixel size of the canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    /// Create a canvas size; both dimensions must be finite and positive.
    pub fn new(width: f64, height: f64) -> Result<Self, CoreError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(CoreError::Validation(format!(
                "Canvas dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_to_percent(&self, p: PixelPoint) -> PercentPoint {
        PercentPoint {
            x: p.x * PITCH_EXTENT / self.width,
            y: p.y * PITCH_EXTENT / self.height,
        }
    }

    pub fn percent_to_pixel(&self, p: PercentPoint) -> PixelPoint {
        PixelPoint {
            x: p.x * self.width / PITCH_EXTENT,
            y: p.y * self.height / PITCH_EXTENT,
        }
    }
}
