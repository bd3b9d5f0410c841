use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{MergeError, Result};
use crate::frame::{Frame, LuminanceProxy, Offset};
use crate::pipeline::config::AlignConfig;

use super::metric::{offset_error, PreparedLevel};
use super::pyramid::{build_pyramid, usable_levels};

/// Offsets found for each candidate, in candidate order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignmentResult {
    pub offsets: Vec<Offset>,
    /// Metric error at the chosen offset (full resolution).
    pub errors: Vec<f32>,
    /// `false` where the search fell back to (0, 0).
    pub confident: Vec<bool>,
}

impl AlignmentResult {
    fn with_capacity(n: usize) -> Self {
        Self {
            offsets: Vec::with_capacity(n),
            errors: Vec::with_capacity(n),
            confident: Vec::with_capacity(n),
        }
    }
}

/// Find the offset aligning each candidate to `reference`.
///
/// Fails only on caller errors: no candidates, or mismatched dimensions.
/// A candidate that cannot be aligned confidently gets offset (0, 0).
pub fn align(
    reference: &Frame,
    candidates: &[Frame],
    config: &AlignConfig,
) -> Result<AlignmentResult> {
    if candidates.is_empty() {
        return Err(MergeError::EmptySequence);
    }
    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.same_dimensions(reference) {
            return Err(MergeError::DimensionMismatch {
                index,
                expected_width: reference.width(),
                expected_height: reference.height(),
                actual_width: candidate.width(),
                actual_height: candidate.height(),
            });
        }
    }

    let reference_plane = reference.luminance_plane(LuminanceProxy::Max);
    let planes: Vec<Array2<f32>> = candidates
        .iter()
        .map(|c| c.luminance_plane(LuminanceProxy::Max))
        .collect();
    align_planes(&reference_plane, &planes, config)
}

/// [`align`] over precomputed luminance planes (8-bit scale).
pub fn align_planes(
    reference: &Array2<f32>,
    candidates: &[Array2<f32>],
    config: &AlignConfig,
) -> Result<AlignmentResult> {
    if candidates.is_empty() {
        return Err(MergeError::EmptySequence);
    }
    let (h, w) = reference.dim();
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.dim() != (h, w) {
            return Err(MergeError::DimensionMismatch {
                index,
                expected_width: w,
                expected_height: h,
                actual_width: candidate.ncols(),
                actual_height: candidate.nrows(),
            });
        }
    }

    let levels = usable_levels(w, h, config.levels);
    let reference_levels = prepare_levels(reference, levels, config);

    let found: Vec<(Offset, f32, bool)> = if candidates.len() >= PARALLEL_FRAME_THRESHOLD {
        candidates
            .par_iter()
            .map(|c| align_one(&reference_levels, c, levels, config))
            .collect()
    } else {
        candidates
            .iter()
            .map(|c| align_one(&reference_levels, c, levels, config))
            .collect()
    };

    let mut result = AlignmentResult::with_capacity(found.len());
    for (i, (offset, error, confident)) in found.into_iter().enumerate() {
        debug!(candidate = i, %offset, error, confident, "Aligned candidate");
        result.offsets.push(offset);
        result.errors.push(error);
        result.confident.push(confident);
    }
    Ok(result)
}

fn prepare_levels(plane: &Array2<f32>, levels: usize, config: &AlignConfig) -> Vec<PreparedLevel> {
    build_pyramid(plane, levels)
        .into_iter()
        .map(|p| PreparedLevel::new(p, config))
        .collect()
}

/// Coarse-to-fine search for one candidate.
fn align_one(
    reference_levels: &[PreparedLevel],
    candidate: &Array2<f32>,
    levels: usize,
    config: &AlignConfig,
) -> (Offset, f32, bool) {
    let candidate_levels = prepare_levels(candidate, levels, config);

    let mut offset = Offset::ZERO;
    let mut error = f32::INFINITY;
    for level in (0..=levels).rev() {
        let radius = if level == levels {
            config.coarse_radius
        } else {
            offset = offset.scaled(2);
            config.refine_radius
        };
        (offset, error) = search_window(
            &reference_levels[level],
            &candidate_levels[level],
            offset,
            radius,
            config,
        );
    }

    let ceiling = config.error_ceiling();
    if error <= ceiling {
        (offset, error, true)
    } else {
        let zero_error = offset_error(&reference_levels[0], &candidate_levels[0], Offset::ZERO, config);
        warn!(
            best = %offset,
            error,
            ceiling,
            "Alignment not confident, using zero offset"
        );
        (Offset::ZERO, zero_error, false)
    }
}

/// Exhaustive search in `center ± radius`, returning the best offset and
/// its error.
fn search_window(
    reference: &PreparedLevel,
    candidate: &PreparedLevel,
    center: Offset,
    radius: i32,
    config: &AlignConfig,
) -> (Offset, f32) {
    let mut best = center;
    let mut best_error = f32::INFINITY;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let trial = Offset::new(center.dx + dx, center.dy + dy);
            let error = offset_error(reference, candidate, trial, config);
            if error < best_error || (error == best_error && tie_key(trial) < tie_key(best)) {
                best = trial;
                best_error = error;
            }
        }
    }
    (best, best_error)
}

/// Preference among equal errors: closest to zero, then smallest |dx|,
/// then smallest |dy|.
fn tie_key(offset: Offset) -> (i64, i32, i32, i32, i32) {
    (
        offset.magnitude_sq(),
        offset.dx.abs(),
        offset.dy.abs(),
        offset.dx,
        offset.dy,
    )
}
