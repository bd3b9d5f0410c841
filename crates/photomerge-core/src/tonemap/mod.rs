//! Tonemapping: fused-range operators, local contrast enhancement and
//! gain/gamma DRO.

pub mod contrast;
pub mod dro;
pub mod operators;

use serde::{Deserialize, Serialize};

use crate::consts::SHORT_EXPOSURE_NS;
use crate::error::{MergeError, Result};
use crate::pipeline::config::{ContrastEnhancement, DroAlgorithm, MergeConfig, TonemapAlgorithm};

pub use contrast::enhance_local_contrast;
pub use dro::{
    apply_gain_gamma, compensate_black_level, compute_brighten_factors, dro, dro_factors, BrightenFactors,
};
pub use operators::tonemap;

/// Tonemap settings for one merge call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TonemapParameters {
    pub algorithm: TonemapAlgorithm,
    pub dro_algorithm: DroAlgorithm,
    /// Local contrast strength in `[0, 1]`.
    pub alpha: f32,
    /// Fixed gain/gamma for the DRO path; derived from the histogram when
    /// `None`.
    pub gain_gamma: Option<BrightenFactors>,
}

impl Default for TonemapParameters {
    fn default() -> Self {
        Self {
            algorithm: TonemapAlgorithm::default(),
            dro_algorithm: DroAlgorithm::default(),
            alpha: 0.0,
            gain_gamma: None,
        }
    }
}

impl TonemapParameters {
    /// Parameters for a burst of `n_frames` whose reference was exposed
    /// for `exposure_time_ns`.
    pub fn from_config(config: &MergeConfig, exposure_time_ns: Option<u64>, n_frames: usize) -> Self {
        Self {
            algorithm: config.tonemap_algorithm,
            dro_algorithm: config.dro_algorithm,
            alpha: hdr_alpha(
                config.contrast_enhancement,
                exposure_time_ns,
                n_frames,
                config.always_alpha,
            ),
            gain_gamma: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(MergeError::invalid(
                "alpha",
                format!("{} is outside [0, 1]", self.alpha),
            ));
        }
        Ok(())
    }
}

/// Local contrast strength for a merge.
///
/// `Smart` enables enhancement only for short reference exposures, where
/// the bracket spans the widest range, and strengthens it with the number
/// of frames. A single frame always uses `always_alpha`.
pub fn hdr_alpha(
    mode: ContrastEnhancement,
    exposure_time_ns: Option<u64>,
    n_frames: usize,
    always_alpha: f32,
) -> f32 {
    if n_frames == 1 {
        return always_alpha;
    }
    match mode {
        ContrastEnhancement::Off => 0.0,
        ContrastEnhancement::Always => always_alpha,
        ContrastEnhancement::Smart => match exposure_time_ns {
            Some(t) if t < SHORT_EXPOSURE_NS => {
                (0.5 + 0.1 * (n_frames as f32 - 3.0)).clamp(0.3, 0.8)
            }
            _ => 0.0,
        },
    }
}
