use ndarray::{Array2, ArrayViewMut1, Axis, Zip};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::accumulator::{try_alloc_plane, Accumulator};
use crate::align::{align_planes, AlignmentResult};
use crate::consts::{MAX_EXPOSURE_GAIN, MID_GREY, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{MergeError, Result};
use crate::frame::{check_dimensions, Frame, LuminanceProxy, Offset};
use crate::ghost::{detect_ghosts_mapped, GhostMask};
use crate::histogram::{compute_histogram, compute_histogram_plane};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::config::{AlignConfig, HdrConfig};
use crate::response::ResponseFunction;
use crate::tonemap::dro::{dro, dro_with_factors};
use crate::tonemap::{enhance_local_contrast, tonemap, TonemapParameters};

use super::order::fold_order;
use super::well_exposedness;

/// Result of fusing a bracket.
///
/// Per-candidate vectors list the non-reference frames in their original
/// order.
#[derive(Clone, Debug)]
pub struct FusionOutput {
    pub frame: Frame,
    pub alignment: AlignmentResult,
    pub responses: Vec<ResponseFunction>,
    pub ghost_fractions: Vec<f32>,
}

/// Per-pixel fusion state. `remaining` is the weight share not yet
/// claimed; `dark` selects which chain receives it.
struct FusionState {
    rgb: Accumulator,
    weight: Array2<f32>,
    remaining: Array2<f32>,
    dark: Array2<bool>,
}

impl FusionState {
    fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            rgb: Accumulator::zeros(width, height)?,
            weight: try_alloc_plane((height, width), 0.0)?,
            remaining: try_alloc_plane((height, width), 0.0)?,
            dark: try_alloc_plane((height, width), false)?,
        })
    }

    fn parallel(&self) -> bool {
        self.weight.len() >= PARALLEL_PIXEL_THRESHOLD
    }

    fn fold_reference(&mut self, frame: &Frame, plane: &Array2<f32>) {
        let parallel = self.parallel();
        let zip = Zip::from(self.rgb.data.lanes_mut(Axis(2)))
            .and(&mut self.weight)
            .and(&mut self.remaining)
            .and(&mut self.dark)
            .and(plane)
            .and(frame.data.lanes(Axis(2)));
        if parallel {
            zip.par_for_each(|rgb, w, r, d, &avg, px| {
                reference_pixel(rgb, w, r, d, avg, [px[0], px[1], px[2]])
            });
        } else {
            zip.for_each(|rgb, w, r, d, &avg, px| {
                reference_pixel(rgb, w, r, d, avg, [px[0], px[1], px[2]])
            });
        }
    }

    fn fold_candidate(&mut self, frame: &Frame, link: &ChainLink<'_>) {
        let parallel = self.parallel();
        let (w, h) = (frame.width(), frame.height());
        let zip = Zip::indexed(self.rgb.data.lanes_mut(Axis(2)))
            .and(&mut self.weight)
            .and(&mut self.remaining)
            .and(&self.dark)
            .and(&link.mask.weights);
        let sample = |x: usize, y: usize| {
            link.offset
                .source(x, y, w, h)
                .map(|(sx, sy)| frame.pixel(sx, sy))
        };
        if parallel {
            zip.par_for_each(|(y, x), rgb, wt, r, &d, &g| {
                if d == link.dark_chain {
                    if let Some(px) = sample(x, y) {
                        candidate_pixel(rgb, wt, r, g, px, link);
                    }
                }
            });
        } else {
            zip.for_each(|(y, x), rgb, wt, r, &d, &g| {
                if d == link.dark_chain {
                    if let Some(px) = sample(x, y) {
                        candidate_pixel(rgb, wt, r, g, px, link);
                    }
                }
            });
        }
    }

    fn normalize(&mut self) {
        let zip = Zip::from(self.rgb.data.lanes_mut(Axis(2))).and(&self.weight);
        let op = |mut rgb: ArrayViewMut1<'_, f32>, &w: &f32| {
            if w > 0.0 {
                rgb.mapv_inplace(|v| v / w);
            }
        };
        if self.weight.len() >= PARALLEL_PIXEL_THRESHOLD {
            zip.par_for_each(op);
        } else {
            zip.for_each(op);
        }
    }
}

/// One frame's place in a brighter or darker chain.
struct ChainLink<'a> {
    offset: Offset,
    response: ResponseFunction,
    mask: &'a GhostMask,
    /// Chain fed by dark reference pixels (the brighter frames).
    dark_chain: bool,
    last: bool,
}

#[inline]
fn reference_pixel(
    mut rgb: ArrayViewMut1<'_, f32>,
    weight: &mut f32,
    remaining: &mut f32,
    dark: &mut bool,
    avg: f32,
    px: [u8; 3],
) {
    let w = well_exposedness(avg);
    for c in 0..3 {
        rgb[c] = w * px[c] as f32;
    }
    *weight = w;
    *remaining = 1.0 - w;
    *dark = avg <= MID_GREY;
}

#[inline]
fn candidate_pixel(
    mut rgb: ArrayViewMut1<'_, f32>,
    weight: &mut f32,
    remaining: &mut f32,
    ghost: f32,
    px: [u8; 3],
    link: &ChainLink<'_>,
) {
    if *remaining <= 0.0 {
        return;
    }
    let avg = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
    let wk = if link.last { 1.0 } else { well_exposedness(avg) };
    let share = *remaining * wk;
    let kept = share * ghost;
    for c in 0..3 {
        rgb[c] += kept * link.response.apply(px[c] as f32);
    }
    *weight += kept;
    *remaining -= share;
}

/// Brightness ratio mapping `candidate` onto `reference`: the exposure-time
/// ratio when both are known, else the ratio of median luminances.
fn exposure_gain(
    reference: &Frame,
    candidate: &Frame,
    reference_plane: &Array2<f32>,
    candidate_plane: &Array2<f32>,
) -> f32 {
    if let (Some(r), Some(c)) = (reference.metadata.exposure_time_ns, candidate.metadata.exposure_time_ns) {
        if r > 0 && c > 0 {
            return r as f32 / c as f32;
        }
    }
    let median = |plane: &Array2<f32>| compute_histogram_plane(plane.view()).interpolated_median();
    match (median(reference_plane), median(candidate_plane)) {
        (Some(r), Some(c)) if r > 0.5 && c > 0.5 => (r / c).clamp(1.0 / MAX_EXPOSURE_GAIN, MAX_EXPOSURE_GAIN),
        _ => 1.0,
    }
}

/// Align each candidate plane after scaling it by its gain onto the
/// reference's brightness. Both planes are capped at the brightest level
/// the two frames can represent, so highlights clipped in either compare
/// equal.
fn align_exposures(
    reference_plane: &Array2<f32>,
    planes: Vec<Array2<f32>>,
    gains: &[f32],
    config: &AlignConfig,
) -> Result<AlignmentResult> {
    let found = planes
        .into_par_iter()
        .zip(gains.par_iter())
        .map(|(plane, &gain)| {
            let ceiling = 255.0 * gain.min(1.0);
            let reference = reference_plane.mapv(|v| v.min(ceiling));
            let candidate = plane.mapv(|v| (v * gain).min(ceiling));
            align_planes(&reference, &[candidate], config)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut alignment = AlignmentResult::default();
    for single in found {
        alignment.offsets.extend(single.offsets);
        alignment.errors.extend(single.errors);
        alignment.confident.extend(single.confident);
    }
    Ok(alignment)
}

/// Fuse an exposure bracket into one 8-bit frame.
///
/// Everything is validated before `frames` is touched. On success the Vec
/// is drained, each frame being dropped once folded. On cancellation the
/// frames not yet folded are left in `frames`.
pub fn fuse_hdr(
    frames: &mut Vec<Frame>,
    reference_index: usize,
    params: &TonemapParameters,
    config: &HdrConfig,
    cancel: &CancelToken,
) -> Result<FusionOutput> {
    if frames.is_empty() {
        return Err(MergeError::EmptySequence);
    }
    if reference_index >= frames.len() {
        return Err(MergeError::invalid(
            "reference_index",
            format!("{reference_index} is out of range for {} frames", frames.len()),
        ));
    }
    params.validate()?;
    let (width, height) = check_dimensions(frames)?;

    if frames.len() == 1 {
        info!(width, height, "Single frame, running DRO");
        let frame = &frames[0];
        let out = match &params.gain_gamma {
            Some(factors) => dro_with_factors(frame, factors, params.alpha, config.contrast_tiles)?,
            None => dro(frame, params.dro_algorithm, params.alpha, config.contrast_tiles)?,
        };
        frames.clear();
        return Ok(FusionOutput {
            frame: out,
            alignment: AlignmentResult::default(),
            responses: Vec::new(),
            ghost_fractions: Vec::new(),
        });
    }

    info!(
        frames = frames.len(),
        reference = reference_index,
        width,
        height,
        "Fusing HDR bracket"
    );

    let candidate_indices: Vec<usize> = (0..frames.len()).filter(|&i| i != reference_index).collect();

    let reference = &frames[reference_index];
    let alignment = {
        let reference_plane = reference.luminance_plane(LuminanceProxy::Max);
        let planes: Vec<Array2<f32>> = candidate_indices
            .iter()
            .map(|&i| frames[i].luminance_plane(LuminanceProxy::Max))
            .collect();
        let gains: Vec<f32> = candidate_indices
            .iter()
            .zip(&planes)
            .map(|(&i, plane)| exposure_gain(reference, &frames[i], &reference_plane, plane))
            .collect();
        align_exposures(&reference_plane, planes, &gains, &config.alignment)?
    };
    cancel.check()?;

    let reference_plane = reference.luminance_plane(LuminanceProxy::Average);
    let reference_exposure = reference.metadata.exposure_time_ns;
    let mut responses = Vec::with_capacity(candidate_indices.len());
    let mut masks = Vec::with_capacity(candidate_indices.len());
    for (k, &i) in candidate_indices.iter().enumerate() {
        let candidate = &frames[i];
        let plane = candidate.luminance_plane(LuminanceProxy::Average);
        let offset = alignment.offsets[k];
        let ratio = match (reference_exposure, candidate.metadata.exposure_time_ns) {
            (Some(r), Some(c)) if c > 0 => Some(r as f32 / c as f32),
            _ => None,
        };
        let response = ResponseFunction::fit(&reference_plane, &plane, offset, ratio);
        let mask = detect_ghosts_mapped(&reference_plane, &plane, offset, response, &config.ghost)?;
        debug!(
            frame = i,
            %offset,
            a = response.a,
            b = response.b,
            ghosts = mask.ghost_fraction(),
            "Prepared bracket frame"
        );
        responses.push(response);
        masks.push(mask);
    }
    let ghost_fractions: Vec<f32> = masks.iter().map(GhostMask::ghost_fraction).collect();

    let median = compute_histogram(reference)
        .summarize()
        .map_or(MID_GREY, |s| s.median_bin as f32);
    let max_possible = responses
        .iter()
        .map(|r| r.apply(255.0))
        .fold(255.0f32, f32::max);
    let metadata = reference.metadata;
    let order = fold_order(frames, reference_index);
    cancel.check()?;

    let mut state = FusionState::new(width, height)?;
    let mut slots: Vec<Option<Frame>> = std::mem::take(frames).into_iter().map(Some).collect();

    if let Some(frame) = slots[reference_index].take() {
        state.fold_reference(&frame, &reference_plane);
    }
    drop(reference_plane);

    let chains = [(&order.brighter, true), (&order.darker, false)];
    for (chain, dark_chain) in chains {
        for (pos, &i) in chain.iter().enumerate() {
            if let Err(err) = cancel.check() {
                frames.extend(slots.into_iter().flatten());
                return Err(err);
            }
            let Some(frame) = slots[i].take() else {
                continue;
            };
            let k = if i < reference_index { i } else { i - 1 };
            let link = ChainLink {
                offset: alignment.offsets[k],
                response: responses[k],
                mask: &masks[k],
                dark_chain,
                last: pos + 1 == chain.len(),
            };
            state.fold_candidate(&frame, &link);
            debug!(frame = i, dark_chain, "Folded bracket frame");
        }
    }
    drop(masks);

    state.normalize();
    let FusionState { rgb, .. } = state;
    let tonemapped = tonemap(&rgb, params.algorithm, max_possible, median)?;
    drop(rgb);
    let frame = enhance_local_contrast(&tonemapped, params.alpha, config.contrast_tiles)?.with_metadata(metadata);

    Ok(FusionOutput {
        frame,
        alignment,
        responses,
        ghost_fractions,
    })
}
