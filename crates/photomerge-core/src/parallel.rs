//! Row-granular parallel-for over pixel buffers.
//!
//! Small images run sequentially; above [`PARALLEL_PIXEL_THRESHOLD`] the
//! rows are distributed over the Rayon pool.

use ndarray::parallel::prelude::*;
use ndarray::{Array, ArrayViewMut, Axis, RemoveAxis};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Call `f(row_index, row)` for every row (axis 0) of `data`.
pub(crate) fn for_each_row_mut<A, D, F>(data: &mut Array<A, D>, f: F)
where
    A: Send + Sync,
    D: RemoveAxis,
    F: Fn(usize, ArrayViewMut<'_, A, D::Smaller>) + Send + Sync,
{
    let shape = data.shape();
    let pixels = shape[0] * shape.get(1).copied().unwrap_or(1);
    if pixels >= PARALLEL_PIXEL_THRESHOLD {
        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    } else {
        for (y, row) in data.axis_iter_mut(Axis(0)).enumerate() {
            f(y, row);
        }
    }
}
