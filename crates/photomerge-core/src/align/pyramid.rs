//! Image pyramids for coarse-to-fine alignment.
//!
//! Each level halves the previous one with a 2x2 box filter, so an even
//! shift at one level is an exact integer shift at the next.

use ndarray::Array2;

use crate::consts::MIN_PYRAMID_SIZE;

/// Build a pyramid with `levels` downsampled levels.
///
/// Returns `levels + 1` planes: index 0 is the input, index `levels` the
/// coarsest.
pub fn build_pyramid(plane: &Array2<f32>, levels: usize) -> Vec<Array2<f32>> {
    let mut pyramid = Vec::with_capacity(levels + 1);
    pyramid.push(plane.clone());
    for level in 0..levels {
        let next = downsample_2x(&pyramid[level]);
        pyramid.push(next);
    }
    pyramid
}

/// Largest level count `<= requested` whose coarsest level keeps both
/// sides at least [`MIN_PYRAMID_SIZE`] pixels.
pub fn usable_levels(width: usize, height: usize, requested: usize) -> usize {
    let mut levels = 0;
    let (mut w, mut h) = (width, height);
    while levels < requested && w / 2 >= MIN_PYRAMID_SIZE && h / 2 >= MIN_PYRAMID_SIZE {
        w /= 2;
        h /= 2;
        levels += 1;
    }
    levels
}

/// Halve a plane with a 2x2 mean. An odd trailing row/column is dropped.
fn downsample_2x(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let new_h = (h / 2).max(1);
    let new_w = (w / 2).max(1);
    Array2::from_shape_fn((new_h, new_w), |(r, c)| {
        let r0 = (r * 2).min(h - 1);
        let c0 = (c * 2).min(w - 1);
        let r1 = (r0 + 1).min(h - 1);
        let c1 = (c0 + 1).min(w - 1);
        (data[[r0, c0]] + data[[r0, c1]] + data[[r1, c0]] + data[[r1, c1]]) * 0.25
    })
}
