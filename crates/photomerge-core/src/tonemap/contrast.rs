//! Local contrast enhancement by tiled histogram equalization.

use ndarray::Array2;
use tracing::debug;

use crate::accumulator::{to_u8, try_alloc};
use crate::consts::{HISTOGRAM_BINS, MIN_CONTRAST_TILE};
use crate::error::{MergeError, Result};
use crate::frame::Frame;
use crate::parallel::for_each_row_mut;

/// Equalization curve of one tile, indexed by 8-bit value.
type TileCurve = [f32; HISTOGRAM_BINS];

/// Blend each pixel's value toward its locally equalized value.
///
/// Works on `max(r, g, b)` and rescales all three channels by the same
/// factor, so hue is kept. `alpha = 0` leaves the frame untouched and
/// `alpha = 1` fully equalizes. Per-tile curves are interpolated
/// bilinearly between tile centres.
pub fn enhance_local_contrast(frame: &Frame, alpha: f32, tiles: usize) -> Result<Frame> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(MergeError::invalid("alpha", format!("{alpha} is outside [0, 1]")));
    }
    if alpha == 0.0 {
        return Ok(frame.clone());
    }

    let (w, h) = (frame.width(), frame.height());
    let tiles_x = tiles.clamp(1, (w / MIN_CONTRAST_TILE).max(1));
    let tiles_y = tiles.clamp(1, (h / MIN_CONTRAST_TILE).max(1));
    debug!(tiles_x, tiles_y, alpha, "Local contrast enhancement");

    let values = Array2::from_shape_fn((h, w), |(y, x)| {
        frame.data[[y, x, 0]].max(frame.data[[y, x, 1]]).max(frame.data[[y, x, 2]])
    });

    let mut curves: Vec<TileCurve> = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        let (y0, y1) = tile_bounds(ty, tiles_y, h);
        for tx in 0..tiles_x {
            let (x0, x1) = tile_bounds(tx, tiles_x, w);
            curves.push(tile_curve(&values, x0, x1, y0, y1));
        }
    }
    let centres_x: Vec<f32> = (0..tiles_x).map(|t| tile_centre(t, tiles_x, w)).collect();
    let centres_y: Vec<f32> = (0..tiles_y).map(|t| tile_centre(t, tiles_y, h)).collect();

    let mut out = try_alloc::<u8>(frame.data.dim())?;
    let src = &frame.data;
    for_each_row_mut(&mut out, |y, mut row| {
        let (ty0, ty1, fy) = interpolation_cell(&centres_y, y as f32);
        for x in 0..w {
            let v = values[[y, x]];
            if v == 0 {
                continue;
            }
            let (tx0, tx1, fx) = interpolation_cell(&centres_x, x as f32);
            let vi = v as usize;
            let top = lerp(curves[ty0 * tiles_x + tx0][vi], curves[ty0 * tiles_x + tx1][vi], fx);
            let bottom = lerp(curves[ty1 * tiles_x + tx0][vi], curves[ty1 * tiles_x + tx1][vi], fx);
            let equalized = lerp(top, bottom, fy);

            let v = v as f32;
            let new_value = (1.0 - alpha) * v + alpha * equalized;
            let scale = new_value / v;
            for c in 0..3 {
                row[[x, c]] = to_u8(src[[y, x, c]] as f32 * scale);
            }
        }
    });

    Ok(Frame::new(out)?.with_metadata(frame.metadata))
}

fn tile_bounds(index: usize, count: usize, size: usize) -> (usize, usize) {
    (index * size / count, (index + 1) * size / count)
}

fn tile_centre(index: usize, count: usize, size: usize) -> f32 {
    let (start, end) = tile_bounds(index, count, size);
    (start + end) as f32 * 0.5 - 0.5
}

/// Neighbouring tile indices around `pos` and the interpolation weight
/// toward the second one.
fn interpolation_cell(centres: &[f32], pos: f32) -> (usize, usize, f32) {
    let last = centres.len() - 1;
    if pos <= centres[0] {
        return (0, 0, 0.0);
    }
    if pos >= centres[last] {
        return (last, last, 0.0);
    }
    let i = centres.iter().rposition(|&c| c <= pos).unwrap_or(0).min(last - 1);
    let t = (pos - centres[i]) / (centres[i + 1] - centres[i]);
    (i, i + 1, t.clamp(0.0, 1.0))
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Equalization curve for one tile.
///
/// The tile's darkest value maps to 0 and its brightest to 255; values
/// outside the tile's range clamp to those ends. A flat tile maps every
/// value to itself.
fn tile_curve(values: &Array2<u8>, x0: usize, x1: usize, y0: usize, y1: usize) -> TileCurve {
    let mut hist = [0u64; HISTOGRAM_BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[values[[y, x]] as usize] += 1;
        }
    }

    let mut curve = [0.0f32; HISTOGRAM_BINS];
    let total: u64 = hist.iter().sum();
    let Some(min_bin) = hist.iter().position(|&c| c > 0) else {
        for (v, out) in curve.iter_mut().enumerate() {
            *out = v as f32;
        }
        return curve;
    };
    let base = hist[min_bin];
    let denom = (total - base) as f32;
    if denom == 0.0 {
        for (v, out) in curve.iter_mut().enumerate() {
            *out = v as f32;
        }
        return curve;
    }

    let mut cumulative = 0u64;
    for (v, out) in curve.iter_mut().enumerate() {
        cumulative += hist[v];
        let num = cumulative as f32 - base as f32;
        *out = (255.0 * (num / denom)).clamp(0.0, 255.0);
    }
    curve
}
