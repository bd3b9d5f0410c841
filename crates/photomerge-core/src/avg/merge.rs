use ndarray::{Array2, ArrayViewMut1, Axis, Zip};
use tracing::debug;

use crate::accumulator::{try_alloc, Accumulator};
use crate::consts::{
    AVG_MAX_GAIN, AVG_NOISE_FLOOR, BLACK_LEVEL_PERCENTILE, MAX_BLACK_LEVEL, NOISY_ISO,
    PARALLEL_PIXEL_THRESHOLD, SPATIAL_WIENER_C,
};
use crate::error::{MergeError, Result};
use crate::frame::{CaptureMetadata, Frame, Offset};
use crate::ghost::GhostMask;
use crate::histogram::compute_histogram_f;
use crate::parallel::for_each_row_mut;
use crate::pipeline::config::AvgConfig;
use crate::tonemap::compensate_black_level;

/// Temporal Wiener filter applied when merging a sample.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Wiener {
    pub c: f32,
    pub cutoff: f32,
}

/// Temporal noise seen while merging: mean absolute luminance difference
/// between each merged frame and the image it was merged into.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoiseEstimate {
    sum: f64,
    samples: u64,
}

impl NoiseEstimate {
    /// Add the differences of one aligned frame. Ghosted pixels and pixels
    /// falling outside the candidate are skipped.
    pub fn add_frame(
        &mut self,
        reference: &Array2<f32>,
        candidate: &Array2<f32>,
        offset: Offset,
        mask: &GhostMask,
    ) {
        let (h, w) = reference.dim();
        for ((y, x), &r) in reference.indexed_iter() {
            if mask.is_ghost(x, y) {
                continue;
            }
            if let Some((cx, cy)) = offset.source(x, y, w, h) {
                self.sum += (r - candidate[[cy, cx]]).abs() as f64;
                self.samples += 1;
            }
        }
    }

    /// Mean difference on the 8-bit scale; 0 before any frame was added.
    pub fn level(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            (self.sum / self.samples as f64) as f32
        }
    }
}

/// Fold `frame` (shifted by `offset`) into `acc` as the sample following
/// `weight` earlier ones: `avg = (weight * avg + new) / (weight + 1)`.
///
/// `new` is first pulled toward `avg` by the Wiener filter and by the
/// ghost mask. Samples falling outside `frame` leave `avg` unchanged.
pub(crate) fn merge_frame(
    acc: &mut Accumulator,
    frame: &Frame,
    weight: f32,
    offset: Offset,
    mask: &GhostMask,
    wiener: Wiener,
) {
    let (w, h) = (frame.width(), frame.height());
    let parallel = w * h >= PARALLEL_PIXEL_THRESHOLD;
    let zip = Zip::indexed(acc.data.lanes_mut(Axis(2))).and(&mask.weights);
    let merge = |(y, x): (usize, usize), avg: ArrayViewMut1<'_, f32>, &ghost: &f32| {
        if let Some((sx, sy)) = offset.source(x, y, w, h) {
            merge_pixel(avg, frame.pixel(sx, sy), weight, ghost, wiener);
        }
    };
    if parallel {
        zip.par_for_each(merge);
    } else {
        zip.for_each(merge);
    }
}

#[inline]
fn merge_pixel(mut avg: ArrayViewMut1<'_, f32>, px: [u8; 3], weight: f32, ghost: f32, wiener: Wiener) {
    let old = [avg[0], avg[1], avg[2]];
    let new = px.map(|v| v as f32);
    let l: f32 = (0..3).map(|c| (old[c] - new[c]) * (old[c] - new[c])).sum();
    let filtered = if l > wiener.cutoff {
        old
    } else {
        let w = l / (l + wiener.c);
        [0, 1, 2].map(|c| w * old[c] + (1.0 - w) * new[c])
    };
    for c in 0..3 {
        let sample = ghost * filtered[c] + (1.0 - ghost) * old[c];
        avg[c] = (weight * old[c] + sample) / (weight + 1.0);
    }
}

/// Radius-1 edge-preserving smoothing: each neighbour is first pulled
/// toward the centre pixel in proportion to how different it is, then the
/// neighbourhood is averaged.
pub fn spatial_denoise(acc: &Accumulator) -> Result<Accumulator> {
    let (h, w, c) = acc.data.dim();
    let mut out = try_alloc::<f32>((h, w, c))?;
    let src = &acc.data;
    for_each_row_mut(&mut out, |y, mut row| {
        for x in 0..w {
            let centre = [src[[y, x, 0]], src[[y, x, 1]], src[[y, x, 2]]];
            let mut sum = [0.0f32; 3];
            let mut count = 0.0f32;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let p = [src[[ny, nx, 0]], src[[ny, nx, 1]], src[[ny, nx, 2]]];
                    let l: f32 = (0..3).map(|k| (centre[k] - p[k]) * (centre[k] - p[k])).sum();
                    let weight = l / (l + SPATIAL_WIENER_C);
                    for k in 0..3 {
                        sum[k] += weight * centre[k] + (1.0 - weight) * p[k];
                    }
                    count += 1.0;
                }
            }
            for k in 0..3 {
                row[[x, k]] = sum[k] / count;
            }
        }
    });
    Ok(Accumulator { data: out })
}

/// Final pass shared by streaming and batch averaging.
///
/// Only a burst that was actually noisy (ISO at least `NOISY_ISO` and a
/// measured `noise_level` above `AVG_NOISE_FLOOR`) is touched: spatial
/// denoise, then black-level removal with a gain that restores the median.
/// Any other accumulator is rounded to 8 bits unchanged.
pub fn finish_accumulator(
    acc: Accumulator,
    metadata: CaptureMetadata,
    noise_level: f32,
    config: &AvgConfig,
) -> Result<Frame> {
    let noisy = metadata.iso.is_some_and(|iso| iso >= NOISY_ISO) && noise_level > AVG_NOISE_FLOOR;
    if !noisy {
        debug!(noise_level, "Finishing average without adjustment");
        return Ok(acc.to_frame()?.with_metadata(metadata));
    }
    let acc = if config.spatial_denoise {
        spatial_denoise(&acc)?
    } else {
        acc
    };

    let histogram = compute_histogram_f(&acc);
    let summary = histogram.summarize().ok_or(MergeError::EmptySequence)?;
    let black_level = (histogram.percentile_bin(BLACK_LEVEL_PERCENTILE) as f32).min(MAX_BLACK_LEVEL);
    let factors = compensate_black_level(&summary, black_level, AVG_MAX_GAIN);
    debug!(
        gain = factors.gain,
        gamma = factors.gamma,
        black_level = factors.black_level,
        noise_level,
        "Finishing average"
    );

    let mut out = try_alloc::<u8>(acc.data.dim())?;
    let src = &acc.data;
    for_each_row_mut(&mut out, |y, mut row| {
        for x in 0..row.nrows() {
            let mapped = factors.apply([src[[y, x, 0]], src[[y, x, 1]], src[[y, x, 2]]]);
            for (c, v) in mapped.into_iter().enumerate() {
                row[[x, c]] = v;
            }
        }
    });
    Ok(Frame::new(out)?.with_metadata(metadata))
}
