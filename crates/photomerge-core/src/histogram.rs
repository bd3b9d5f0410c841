//! 256-bin luminance histograms and summary statistics.

use ndarray::parallel::prelude::*;
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::accumulator::{to_u8, Accumulator};
use crate::consts::HISTOGRAM_BINS;
use crate::frame::{Frame, LuminanceProxy};

/// Ordered array of 256 bin counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    pub bins: [u64; HISTOGRAM_BINS],
}

/// Position statistics of a histogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub min_nonzero_bin: u8,
    /// Smallest bin at which the cumulative count reaches `ceil(total / 2)`.
    pub median_bin: u8,
    pub max_nonzero_bin: u8,
}

impl HistogramSummary {
    pub fn spread(&self) -> u8 {
        self.max_nonzero_bin - self.min_nonzero_bin
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            bins: [0; HISTOGRAM_BINS],
        }
    }
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// `None` only for an empty histogram.
    pub fn summarize(&self) -> Option<HistogramSummary> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let min = self.bins.iter().position(|&c| c > 0)?;
        let max = self.bins.iter().rposition(|&c| c > 0)?;
        let half = total.div_ceil(2);
        let median = self.cumulative_index(half);
        Some(HistogramSummary {
            min_nonzero_bin: min as u8,
            median_bin: median as u8,
            max_nonzero_bin: max as u8,
        })
    }

    /// Smallest bin at which the cumulative count reaches `fraction * total`.
    pub fn percentile_bin(&self, fraction: f32) -> u8 {
        let total = self.total();
        let target = ((total as f64 * fraction.clamp(0.0, 1.0) as f64).ceil() as u64).max(1);
        self.cumulative_index(target) as u8
    }

    /// Median with sub-bin precision, treating each bin `b` as samples
    /// spread evenly over `[b - 0.5, b + 0.5)`. `None` for an empty
    /// histogram.
    pub fn interpolated_median(&self) -> Option<f32> {
        let half = self.total() as f64 / 2.0;
        if half == 0.0 {
            return None;
        }
        let mut below = 0u64;
        for (bin, &count) in self.bins.iter().enumerate() {
            if count > 0 && (below + count) as f64 >= half {
                return Some((bin as f64 - 0.5 + (half - below as f64) / count as f64) as f32);
            }
            below += count;
        }
        Some((HISTOGRAM_BINS - 1) as f32)
    }

    pub fn mean(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &c)| i as u64 * c)
            .sum();
        (weighted as f64 / total as f64) as f32
    }

    /// Cumulative counts: `cdf[i]` = number of samples `<= i`.
    pub fn cumulative(&self) -> [u64; HISTOGRAM_BINS] {
        let mut cdf = [0u64; HISTOGRAM_BINS];
        let mut running = 0u64;
        for (c, &count) in cdf.iter_mut().zip(self.bins.iter()) {
            running += count;
            *c = running;
        }
        cdf
    }

    fn cumulative_index(&self, target: u64) -> usize {
        let mut running = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            running += count;
            if running >= target {
                return i;
            }
        }
        HISTOGRAM_BINS - 1
    }

    fn merge(mut self, other: Histogram) -> Histogram {
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            *a += *b;
        }
        self
    }
}

/// Histogram of `max(r, g, b)` over every pixel.
pub fn compute_histogram(frame: &Frame) -> Histogram {
    compute_histogram_with(frame, LuminanceProxy::Max)
}

/// Histogram of the given luminance proxy over every pixel.
///
/// `Average` rounds to the nearest integer.
pub fn compute_histogram_with(frame: &Frame, proxy: LuminanceProxy) -> Histogram {
    frame
        .data
        .axis_iter(Axis(0))
        .into_par_iter()
        .fold(Histogram::default, |mut hist, row| {
            for px in row.axis_iter(Axis(0)) {
                let v = proxy.apply(px[0] as f32, px[1] as f32, px[2] as f32);
                hist.bins[to_u8(v) as usize] += 1;
            }
            hist
        })
        .reduce(Histogram::default, Histogram::merge)
}

/// Histogram of a float accumulator. Each channel is rounded to 8 bits
/// before the max is taken.
pub fn compute_histogram_f(acc: &Accumulator) -> Histogram {
    acc.data
        .axis_iter(Axis(0))
        .into_par_iter()
        .fold(Histogram::default, |mut hist, row| {
            for px in row.axis_iter(Axis(0)) {
                let v = to_u8(px[0]).max(to_u8(px[1])).max(to_u8(px[2]));
                hist.bins[v as usize] += 1;
            }
            hist
        })
        .reduce(Histogram::default, Histogram::merge)
}

/// Histogram of a scalar plane whose values are on the 8-bit scale.
pub fn compute_histogram_plane(plane: ArrayView2<'_, f32>) -> Histogram {
    let mut hist = Histogram::default();
    for &v in plane.iter() {
        hist.bins[to_u8(v) as usize] += 1;
    }
    hist
}
