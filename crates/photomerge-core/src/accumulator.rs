//! High-precision working buffer for fusion and averaging.

use ndarray::{Array2, Array3};

use crate::consts::CHANNEL_COUNT;
use crate::error::{MergeError, Result};
use crate::frame::{Frame, LuminanceProxy};
use crate::parallel::for_each_row_mut;

/// `f32` RGB buffer of shape `(height, width, 3)`.
///
/// Values are on the 8-bit scale but may exceed 255 while fusing brackets.
#[derive(Debug)]
pub struct Accumulator {
    pub data: Array3<f32>,
}

impl Accumulator {
    /// Allocate a zeroed accumulator, reporting allocation failure instead
    /// of aborting.
    pub fn zeros(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            data: try_alloc((height, width, CHANNEL_COUNT))?,
        })
    }

    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let mut acc = Self::zeros(frame.width(), frame.height())?;
        acc.data
            .iter_mut()
            .zip(frame.data.iter())
            .for_each(|(a, &v)| *a = v as f32);
        Ok(acc)
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    /// Round each sample to the nearest 8-bit value.
    pub fn to_frame(&self) -> Result<Frame> {
        let mut out = try_alloc::<u8>(self.data.dim())?;
        let src = &self.data;
        for_each_row_mut(&mut out, |y, mut row| {
            for ((x, c), v) in row.indexed_iter_mut() {
                *v = to_u8(src[[y, x, c]]);
            }
        });
        Frame::new(out)
    }

    /// Luminance proxy of the rounded 8-bit snapshot.
    pub fn luminance_plane(&self, proxy: LuminanceProxy) -> Array2<f32> {
        let (h, w, _) = self.data.dim();
        Array2::from_shape_fn((h, w), |(y, x)| {
            proxy.apply(
                to_u8(self.data[[y, x, 0]]) as f32,
                to_u8(self.data[[y, x, 1]]) as f32,
                to_u8(self.data[[y, x, 2]]) as f32,
            )
        })
    }
}

/// Round-to-nearest conversion clamped to the 8-bit range.
#[inline]
pub fn to_u8(v: f32) -> u8 {
    (v + 0.5).clamp(0.0, 255.0) as u8
}

/// Allocate a zeroed `(h, w, c)` array, mapping allocator failure to
/// [`MergeError::AllocationFailed`].
pub(crate) fn try_alloc<T: Clone + Default>(shape: (usize, usize, usize)) -> Result<Array3<T>> {
    let len = shape
        .0
        .checked_mul(shape.1)
        .and_then(|n| n.checked_mul(shape.2))
        .ok_or(MergeError::AllocationFailed { bytes: usize::MAX })?;
    let buf = try_alloc_vec::<T>(len)?;
    Array3::from_shape_vec(shape, buf).map_err(|_| MergeError::AllocationFailed { bytes: len })
}

/// Allocate a `(h, w)` plane filled with `value`.
pub(crate) fn try_alloc_plane<T: Clone + Default>(shape: (usize, usize), value: T) -> Result<Array2<T>> {
    let len = shape
        .0
        .checked_mul(shape.1)
        .ok_or(MergeError::AllocationFailed { bytes: usize::MAX })?;
    let mut buf = try_alloc_vec::<T>(len)?;
    buf.fill(value);
    Array2::from_shape_vec(shape, buf).map_err(|_| MergeError::AllocationFailed { bytes: len })
}

fn try_alloc_vec<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut buf: Vec<T> = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| MergeError::AllocationFailed { bytes })?;
    buf.resize(len, T::default());
    Ok(buf)
}
