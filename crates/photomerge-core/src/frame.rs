use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::consts::CHANNEL_COUNT;
use crate::error::{MergeError, Result};

/// Capture metadata supplied by the camera/loader alongside each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub iso: Option<u32>,
    pub exposure_time_ns: Option<u64>,
}

impl CaptureMetadata {
    pub fn new(iso: u32, exposure_time_ns: u64) -> Self {
        Self {
            iso: Some(iso),
            exposure_time_ns: Some(exposure_time_ns),
        }
    }
}

/// A single 8-bit RGB frame.
///
/// Pixel data is row-major with shape `(height, width, 3)`, so the row
/// stride is `width * 3` samples.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Array3<u8>,
    pub metadata: CaptureMetadata,
}

impl Frame {
    pub fn new(data: Array3<u8>) -> Result<Self> {
        let (h, w, c) = data.dim();
        if h == 0 || w == 0 || c != CHANNEL_COUNT {
            return Err(MergeError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Ok(Self {
            data,
            metadata: CaptureMetadata::default(),
        })
    }

    /// Build a frame from packed RGB bytes (`width * height * 3`).
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: Vec<u8>) -> Result<Self> {
        let data = Array3::from_shape_vec((height, width, CHANNEL_COUNT), bytes)
            .map_err(|_| MergeError::InvalidDimensions { width, height })?;
        Self::new(data)
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> [u8; 3],
    {
        let data = Array3::from_shape_fn((height, width, CHANNEL_COUNT), |(y, x, c)| f(x, y)[c]);
        Self::new(data)
    }

    pub fn with_metadata(mut self, metadata: CaptureMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn stride(&self) -> usize {
        self.width() * CHANNEL_COUNT
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width() == other.width() && self.height() == other.height()
    }

    /// Per-pixel luminance proxy as an `f32` plane of shape `(height, width)`.
    pub fn luminance_plane(&self, proxy: LuminanceProxy) -> Array2<f32> {
        let (h, w, _) = self.data.dim();
        Array2::from_shape_fn((h, w), |(y, x)| {
            proxy.apply(
                self.data[[y, x, 0]] as f32,
                self.data[[y, x, 1]] as f32,
                self.data[[y, x, 2]] as f32,
            )
        })
    }

    /// Box-filter downsample by an integer factor. Trailing pixels that do
    /// not fill a whole block are dropped.
    pub fn downsample(&self, factor: usize) -> Result<Frame> {
        if factor <= 1 {
            return Ok(self.clone());
        }
        let new_w = self.width() / factor;
        let new_h = self.height() / factor;
        if new_w == 0 || new_h == 0 {
            return Err(MergeError::InvalidDimensions {
                width: new_w,
                height: new_h,
            });
        }
        let area = (factor * factor) as u32;
        let data = Array3::from_shape_fn((new_h, new_w, CHANNEL_COUNT), |(y, x, c)| {
            let mut sum = 0u32;
            for sy in y * factor..(y + 1) * factor {
                for sx in x * factor..(x + 1) * factor {
                    sum += self.data[[sy, sx, c]] as u32;
                }
            }
            ((sum + area / 2) / area) as u8
        });
        Ok(Frame::new(data)?.with_metadata(self.metadata))
    }

    /// Consume the frame and return packed RGB bytes.
    pub fn into_rgb_bytes(self) -> Vec<u8> {
        match self.data.as_slice() {
            Some(slice) => slice.to_vec(),
            None => self.data.iter().copied().collect(),
        }
    }
}

/// Scalar brightness proxy computed from an RGB sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuminanceProxy {
    /// `max(r, g, b)`, the "value" channel.
    #[default]
    Max,
    /// `(r + g + b) / 3`.
    Average,
}

impl LuminanceProxy {
    #[inline]
    pub fn apply(self, r: f32, g: f32, b: f32) -> f32 {
        match self {
            Self::Max => r.max(g).max(b),
            Self::Average => (r + g + b) / 3.0,
        }
    }
}

impl std::fmt::Display for LuminanceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "Max"),
            Self::Average => write!(f, "Average"),
        }
    }
}

/// Integer pixel offset of a candidate frame relative to a reference.
///
/// The candidate pixel at `(x + dx, y + dy)` corresponds to the reference
/// pixel at `(x, y)`. Always expressed at full resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub const ZERO: Offset = Offset { dx: 0, dy: 0 };

    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn magnitude_sq(&self) -> i64 {
        let dx = self.dx as i64;
        let dy = self.dy as i64;
        dx * dx + dy * dy
    }

    pub fn scaled(&self, factor: i32) -> Self {
        Self {
            dx: self.dx * factor,
            dy: self.dy * factor,
        }
    }

    /// Source coordinate in the candidate for reference pixel `(x, y)`,
    /// or `None` when it falls outside a `width x height` frame.
    #[inline]
    pub fn source(&self, x: usize, y: usize, width: usize, height: usize) -> Option<(usize, usize)> {
        let sx = x as i64 + self.dx as i64;
        let sy = y as i64 + self.dy as i64;
        if sx < 0 || sy < 0 || sx >= width as i64 || sy >= height as i64 {
            None
        } else {
            Some((sx as usize, sy as usize))
        }
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}

/// Check that every frame shares the first frame's dimensions.
///
/// Returns `(width, height)` of the set.
pub fn check_dimensions(frames: &[Frame]) -> Result<(usize, usize)> {
    let first = frames.first().ok_or(MergeError::EmptySequence)?;
    let (w, h) = (first.width(), first.height());
    for (index, frame) in frames.iter().enumerate().skip(1) {
        if !frame.same_dimensions(first) {
            return Err(MergeError::DimensionMismatch {
                index,
                expected_width: w,
                expected_height: h,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }
    }
    Ok((w, h))
}
