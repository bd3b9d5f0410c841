//! Gain/gamma brightening shared by single-frame DRO and the Avg finish
//! pass.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accumulator::{to_u8, try_alloc};
use crate::consts::{
    DRO_MAX_GAIN, IDEAL_BRIGHTNESS_BRIGHT, IDEAL_BRIGHTNESS_DIM, LOW_ISO, MAX_SHADOW_LIFT,
    MIN_GAMMA, SHADOW_KNEE, SHORT_EXPOSURE_NS,
};
use crate::error::{MergeError, Result};
use crate::frame::{CaptureMetadata, Frame};
use crate::histogram::{compute_histogram, HistogramSummary};
use crate::parallel::for_each_row_mut;
use crate::pipeline::config::DroAlgorithm;

use super::contrast::enhance_local_contrast;

/// Brightening curve: `((v - black_level) * 255 / (255 - black_level)) * gain`,
/// then a gamma applied to the max channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrightenFactors {
    pub gain: f32,
    pub gamma: f32,
    pub black_level: f32,
}

impl Default for BrightenFactors {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BrightenFactors {
    pub const IDENTITY: BrightenFactors = BrightenFactors {
        gain: 1.0,
        gamma: 1.0,
        black_level: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Interpolate toward identity: `strength = 0` gives identity,
    /// `strength = 1` returns `self`.
    pub fn scaled(&self, strength: f32) -> Self {
        let s = strength.clamp(0.0, 1.0);
        Self {
            gain: 1.0 + (self.gain - 1.0) * s,
            gamma: 1.0 + (self.gamma - 1.0) * s,
            black_level: self.black_level * s,
        }
    }

    #[inline]
    pub(crate) fn apply(&self, rgb: [f32; 3]) -> [u8; 3] {
        let white_level = 255.0 / (255.0 - self.black_level);
        let mut out = rgb.map(|v| ((v - self.black_level) * white_level).clamp(0.0, 255.0) * self.gain);
        if self.gamma != 1.0 {
            let value = out[0].max(out[1]).max(out[2]);
            if value >= 0.5 {
                let new_value = (value / 255.0).powf(self.gamma) * 255.0;
                let gamma_scale = new_value / value;
                out = out.map(|v| v * gamma_scale);
            }
        }
        out.map(to_u8)
    }
}

/// Whether metadata describes a bright scene: low ISO and a short
/// exposure.
fn is_bright_scene(metadata: &CaptureMetadata) -> bool {
    matches!(metadata.iso, Some(iso) if iso < LOW_ISO)
        && matches!(metadata.exposure_time_ns, Some(t) if t < SHORT_EXPOSURE_NS)
}

/// Gain (and gamma, when gain alone would clip) that lifts the median
/// brightness toward an ideal target.
pub fn compute_brighten_factors(
    summary: &HistogramSummary,
    metadata: &CaptureMetadata,
    max_gain: f32,
) -> BrightenFactors {
    let ideal = if is_bright_scene(metadata) {
        IDEAL_BRIGHTNESS_BRIGHT
    } else {
        IDEAL_BRIGHTNESS_DIM
    };
    let median = (summary.median_bin as f32).max(1.0);
    let target = median.max(ideal);
    let (gain, gamma) = fit_gain_gamma(median, summary.max_nonzero_bin as f32, target, max_gain);

    debug!(median, target, gain, gamma, "Brighten factors");
    BrightenFactors {
        gain,
        gamma,
        black_level: 0.0,
    }
}

/// Factors that subtract `black_level` and then restore the median to its
/// original brightness, so only the noise floor is removed.
///
/// A zero black level gives [`BrightenFactors::IDENTITY`].
pub fn compensate_black_level(summary: &HistogramSummary, black_level: f32, max_gain: f32) -> BrightenFactors {
    if black_level <= 0.0 {
        return BrightenFactors::IDENTITY;
    }
    let black_level = black_level.min(254.0);
    let white_level = 255.0 / (255.0 - black_level);
    let stretch = |v: u8| ((v as f32 - black_level) * white_level).max(0.0);
    let target = summary.median_bin as f32;
    let (gain, gamma) = fit_gain_gamma(
        stretch(summary.median_bin),
        stretch(summary.max_nonzero_bin),
        target,
        max_gain,
    );
    debug!(black_level, target, gain, gamma, "Black level compensation");
    BrightenFactors {
        gain,
        gamma,
        black_level,
    }
}

/// Gain lifting `median` to `target`, bounded by `max_gain`. When that gain
/// would clip `max_bin`, the gain is cut to fit and a gamma below 1 makes up
/// the rest.
fn fit_gain_gamma(median: f32, max_bin: f32, target: f32, max_gain: f32) -> (f32, f32) {
    let median = median.max(1.0);
    let max_bin = max_bin.max(1.0);
    let mut gain = (target / median).clamp(1.0, max_gain.max(1.0));
    let mut gamma = 1.0f32;
    if gain * max_bin > 255.0 {
        gain = (255.0 / max_bin).max(1.0);
        let brightened = gain * median;
        if brightened < target && target < 255.0 {
            gamma = ((target / 255.0).ln() / (brightened / 255.0).ln()).clamp(MIN_GAMMA, 1.0);
        }
    }
    (gain, gamma)
}

/// Brighten factors for single-frame DRO: as [`compute_brighten_factors`],
/// with gamma additionally lowered in proportion to how dark the darkest
/// populated bin is.
pub fn dro_factors(summary: &HistogramSummary, metadata: &CaptureMetadata) -> BrightenFactors {
    let mut factors = compute_brighten_factors(summary, metadata, DRO_MAX_GAIN);
    let darkness = ((SHADOW_KNEE - summary.min_nonzero_bin as f32) / SHADOW_KNEE).clamp(0.0, 1.0);
    factors.gamma = (factors.gamma * (1.0 - MAX_SHADOW_LIFT * darkness)).max(MIN_GAMMA);
    factors
}

/// Apply gain/gamma to an 8-bit frame.
pub fn apply_gain_gamma(frame: &Frame, factors: &BrightenFactors) -> Result<Frame> {
    if !(0.0..255.0).contains(&factors.black_level) || factors.gain <= 0.0 || factors.gamma <= 0.0 {
        return Err(MergeError::invalid("factors", format!("{factors:?}")));
    }
    if factors.is_identity() {
        return Ok(frame.clone());
    }
    let mut out = try_alloc::<u8>(frame.data.dim())?;
    let src = &frame.data;
    for_each_row_mut(&mut out, |y, mut row| {
        for x in 0..row.nrows() {
            let mapped = factors.apply([
                src[[y, x, 0]] as f32,
                src[[y, x, 1]] as f32,
                src[[y, x, 2]] as f32,
            ]);
            for (c, v) in mapped.into_iter().enumerate() {
                row[[x, c]] = v;
            }
        }
    });
    Ok(Frame::new(out)?.with_metadata(frame.metadata))
}

/// Single-frame dynamic range optimization.
///
/// `alpha` scales both the gain/gamma curve and the local contrast
/// enhancement; `alpha = 0` returns the input unchanged.
pub fn dro(frame: &Frame, algorithm: DroAlgorithm, alpha: f32, tiles: usize) -> Result<Frame> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(MergeError::invalid("alpha", format!("{alpha} is outside [0, 1]")));
    }
    let brightened = match algorithm {
        DroAlgorithm::None => frame.clone(),
        DroAlgorithm::GainGamma => {
            let hist = compute_histogram(frame);
            let summary = hist.summarize().ok_or(MergeError::EmptySequence)?;
            let factors = dro_factors(&summary, &frame.metadata).scaled(alpha);
            apply_gain_gamma(frame, &factors)?
        }
    };
    enhance_local_contrast(&brightened, alpha, tiles)
}

/// [`dro`] with explicit factors instead of histogram-derived ones.
pub fn dro_with_factors(frame: &Frame, factors: &BrightenFactors, alpha: f32, tiles: usize) -> Result<Frame> {
    let brightened = apply_gain_gamma(frame, factors)?;
    enhance_local_contrast(&brightened, alpha, tiles)
}
