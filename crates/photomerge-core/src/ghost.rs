//! Ghost detection: per-pixel disagreement between aligned frames.

use ndarray::Array2;

use crate::error::{MergeError, Result};
use crate::frame::{Frame, LuminanceProxy, Offset};
use crate::parallel::for_each_row_mut;
use crate::pipeline::config::GhostConfig;
use crate::response::ResponseFunction;

/// Coverage weight per reference pixel: 1 = consistent, 0 = ghost.
#[derive(Clone, Debug, PartialEq)]
pub struct GhostMask {
    pub weights: Array2<f32>,
}

impl GhostMask {
    /// A mask with no ghosted pixels.
    pub fn clear(width: usize, height: usize) -> Self {
        Self {
            weights: Array2::from_elem((height, width), 1.0),
        }
    }

    pub fn width(&self) -> usize {
        self.weights.ncols()
    }

    pub fn height(&self) -> usize {
        self.weights.nrows()
    }

    #[inline]
    pub fn weight(&self, x: usize, y: usize) -> f32 {
        self.weights[[y, x]]
    }

    pub fn is_ghost(&self, x: usize, y: usize) -> bool {
        self.weight(x, y) < 0.5
    }

    /// Fraction of pixels flagged as ghosts.
    pub fn ghost_fraction(&self) -> f32 {
        let total = self.weights.len();
        if total == 0 {
            return 0.0;
        }
        let flagged = self.weights.iter().filter(|&&w| w < 0.5).count();
        flagged as f32 / total as f32
    }
}

/// Compare `candidate` (shifted by `offset`) against `reference`.
pub fn detect_ghosts(
    reference: &Frame,
    candidate: &Frame,
    offset: Offset,
    config: &GhostConfig,
) -> Result<GhostMask> {
    detect_ghosts_mapped(
        &reference.luminance_plane(LuminanceProxy::Average),
        &candidate.luminance_plane(LuminanceProxy::Average),
        offset,
        ResponseFunction::IDENTITY,
        config,
    )
}

/// Ghost detection on luminance planes, mapping the candidate through
/// `response` first so differently exposed frames can be compared.
///
/// The motion threshold grows with the reference's local contrast (3x3
/// max - min) so that edges and texture are not flagged as motion.
/// Samples outside `[clip_low, clip_high]`, and pixels whose source falls
/// outside the candidate, are never flagged.
pub fn detect_ghosts_mapped(
    reference: &Array2<f32>,
    candidate: &Array2<f32>,
    offset: Offset,
    response: ResponseFunction,
    config: &GhostConfig,
) -> Result<GhostMask> {
    let (h, w) = reference.dim();
    if candidate.dim() != (h, w) {
        return Err(MergeError::DimensionMismatch {
            index: 0,
            expected_width: w,
            expected_height: h,
            actual_width: candidate.ncols(),
            actual_height: candidate.nrows(),
        });
    }

    let mut weights = Array2::<f32>::ones((h, w));
    for_each_row_mut(&mut weights, |y, mut row| {
        for x in 0..w {
            let Some((cx, cy)) = offset.source(x, y, w, h) else {
                continue;
            };
            let r = reference[[y, x]];
            let c = candidate[[cy, cx]];
            if r < config.clip_low || r > config.clip_high || c < config.clip_low || c > config.clip_high {
                continue;
            }
            let diff = (r - response.apply(c)).abs();
            let threshold =
                (config.base_threshold + config.contrast_factor * local_contrast(reference, x, y)).max(1e-3);
            row[x] = if diff <= threshold {
                1.0
            } else if diff >= 2.0 * threshold {
                0.0
            } else {
                2.0 - diff / threshold
            };
        }
    });

    Ok(GhostMask { weights })
}

fn local_contrast(plane: &Array2<f32>, x: usize, y: usize) -> f32 {
    let (h, w) = plane.dim();
    let mut lo = f32::MAX;
    let mut hi = f32::MIN;
    for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
        for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
            let v = plane[[ny, nx]];
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    hi - lo
}
