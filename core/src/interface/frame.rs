use crate::prelude::{MonitorError, MonitorResult};
use ndarray::{s, Array3};
use std::sync::Arc;

/// Raw RGB8 camera frame laid out as `(height, width, 3)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array3<u8>,
}

impl Frame {
    pub fn from_array(pixels: Array3<u8>) -> MonitorResult<Self> {
        let (height, width, channels) = pixels.dim();
        if channels != 3 {
            return Err(MonitorError::InvalidFrame(format!(
                "expected 3 channels, got {}",
                channels
            )));
        }
        if height == 0 || width == 0 {
            return Err(MonitorError::InvalidFrame("frame has no pixels".into()));
        }
        Ok(Self { pixels })
    }

    /// Builds a frame from packed row-major RGB bytes.
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> MonitorResult<Self> {
        let pixels = Array3::from_shape_vec((height, width, 3), data)
            .map_err(|err| MonitorError::InvalidFrame(err.to_string()))?;
        Self::from_array(pixels)
    }

    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let pixels = Array3::from_shape_fn((height.max(1), width.max(1), 3), |(_, _, c)| rgb[c]);
        Self { pixels }
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some([
            self.pixels[[y, x, 0]],
            self.pixels[[y, x, 1]],
            self.pixels[[y, x, 2]],
        ])
    }

    /// Paints `[x0, x1) x [y0, y1)`, clipped to the frame.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, rgb: [u8; 3]) {
        let x1 = x1.min(self.width());
        let y1 = y1.min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for (channel, value) in rgb.iter().enumerate() {
            self.pixels
                .slice_mut(s![y0..y1, x0..x1, channel])
                .fill(*value);
        }
    }

    /// Packed row-major RGB bytes.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().copied().collect()
    }
}

/// Frame stamped with the moment it was captured into a clip.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    pub captured_at: f64,
    pub frame: Arc<Frame>,
}

impl TimedFrame {
    pub fn new(captured_at: f64, frame: Arc<Frame>) -> Self {
        Self { captured_at, frame }
    }
}
