//! Exposure-bracket fusion into a single tonemapped frame.

mod fusion;
mod order;

pub use fusion::{fuse_hdr, FusionOutput};
pub use order::{fold_order, FoldOrder};

use crate::consts::{HDR_MIN_WEIGHT, HDR_SAFE_RANGE, MID_GREY};

/// Weight of a sample by how well exposed it is.
///
/// 1 inside the safe range around mid grey, falling linearly to
/// `HDR_MIN_WEIGHT` at 0 and 255.
#[inline]
pub fn well_exposedness(avg: f32) -> f32 {
    let diff = (avg - MID_GREY).abs();
    if diff <= HDR_SAFE_RANGE {
        return 1.0;
    }
    let t = (diff - HDR_SAFE_RANGE) / (MID_GREY - HDR_SAFE_RANGE);
    (1.0 - (1.0 - HDR_MIN_WEIGHT) * t).clamp(HDR_MIN_WEIGHT, 1.0)
}
