//! Difference metrics evaluated at a trial offset.

use ndarray::Array2;

use crate::consts::{MID_GREY, MIN_MTB_BAND};
use crate::frame::Offset;
use crate::histogram::compute_histogram_plane;
use crate::pipeline::config::{AlignConfig, AlignMetric};

/// One pyramid level prepared for the configured metric.
pub(crate) struct PreparedLevel {
    /// Luminance, or for MTB a bitmap in `[0, 1]` that ramps across a band
    /// around the median.
    values: Array2<f32>,
    bitmap: bool,
}

impl PreparedLevel {
    pub(crate) fn new(plane: Array2<f32>, config: &AlignConfig) -> Self {
        match config.metric {
            AlignMetric::Luminance => Self {
                values: plane,
                bitmap: false,
            },
            AlignMetric::MedianThreshold => {
                let median = compute_histogram_plane(plane.view())
                    .interpolated_median()
                    .unwrap_or(0.0);
                let band = (config.mtb_band * median.max(1.0) / MID_GREY).max(MIN_MTB_BAND);
                let values = plane.mapv(|v| ((v - median) / (2.0 * band) + 0.5).clamp(0.0, 1.0));
                Self { values, bitmap: true }
            }
        }
    }

    pub(crate) fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// Error between `reference` and `candidate` shifted by `offset`.
///
/// Luminance: mean absolute difference over the overlap, ignoring
/// differences at or below the noise threshold. MTB: mean bitmap
/// difference over the overlap, so a full mismatch counts 1 and pixels near
/// the median count in proportion to how far apart they are.
///
/// Returns `f32::INFINITY` when the overlap is smaller than half the frame.
pub(crate) fn offset_error(
    reference: &PreparedLevel,
    candidate: &PreparedLevel,
    offset: Offset,
    config: &AlignConfig,
) -> f32 {
    let (h, w) = reference.dim();
    let (dx, dy) = (offset.dx as i64, offset.dy as i64);
    let (w_i, h_i) = (w as i64, h as i64);

    let x0 = (-dx).max(0);
    let x1 = (w_i - dx).min(w_i);
    let y0 = (-dy).max(0);
    let y1 = (h_i - dy).min(h_i);
    if x1 <= x0 || y1 <= y0 {
        return f32::INFINITY;
    }
    let overlap = ((x1 - x0) * (y1 - y0)) as usize;
    if overlap * 2 < w * h {
        return f32::INFINITY;
    }

    let noise = if reference.bitmap { 0.0 } else { config.noise_threshold };
    let mut sum = 0.0f64;
    for y in y0..y1 {
        let (ry, cy) = (y as usize, (y + dy) as usize);
        for x in x0..x1 {
            let d = (reference.values[[ry, x as usize]] - candidate.values[[cy, (x + dx) as usize]]).abs();
            if d > noise {
                sum += d as f64;
            }
        }
    }
    (sum / overlap as f64) as f32
}
