//! Global operators from the fused high-range accumulator to 8 bits.

use crate::accumulator::{to_u8, try_alloc, Accumulator};
use crate::error::Result;
use crate::frame::Frame;
use crate::parallel::for_each_row_mut;
use crate::pipeline::config::TonemapAlgorithm;

/// Exposure factor of the exponential operator.
const EXPONENTIAL_EXPOSURE: f32 = 1.2;

/// Input scale of the filmic curve.
const FILMIC_EXPOSURE_BIAS: f32 = 2.0 / 255.0;

/// Resolved per-call constants of an operator.
#[derive(Clone, Copy, Debug)]
enum Operator {
    Clamp,
    Exponential { linear_scale: f32 },
    Reinhard { tonemap_scale: f32, linear_scale: f32 },
    Filmic { white_scale: f32 },
    Aces,
}

impl Operator {
    fn resolve(algorithm: TonemapAlgorithm, max_possible: f32, median: f32) -> Self {
        let max_possible = max_possible.max(1.0);
        match algorithm {
            TonemapAlgorithm::Clamp => Self::Clamp,
            TonemapAlgorithm::Exponential => Self::Exponential {
                linear_scale: 1.0 / (1.0 - (-EXPONENTIAL_EXPOSURE * max_possible / 255.0).exp()),
            },
            TonemapAlgorithm::Reinhard => {
                if max_possible <= 255.5 {
                    return Self::Clamp;
                }
                // Median brightness is preserved; the brightest possible
                // value lands on 255.
                let median = median.clamp(1.0, 254.0);
                let tonemap_scale = max_possible * (255.0 - median) / (max_possible - 255.0);
                let linear_scale = (tonemap_scale + max_possible) / max_possible;
                Self::Reinhard {
                    tonemap_scale,
                    linear_scale,
                }
            }
            TonemapAlgorithm::Filmic => {
                let white = FILMIC_EXPOSURE_BIAS * max_possible.max(255.0);
                Self::Filmic {
                    white_scale: 255.0 / uncharted2(white),
                }
            }
            TonemapAlgorithm::Aces => Self::Aces,
        }
    }

    #[inline]
    fn map(&self, rgb: [f32; 3]) -> [u8; 3] {
        match *self {
            Self::Clamp => rgb.map(to_u8),
            Self::Exponential { linear_scale } => rgb.map(|v| {
                to_u8(linear_scale * 255.0 * (1.0 - (-EXPONENTIAL_EXPOSURE * v / 255.0).exp()))
            }),
            Self::Reinhard {
                tonemap_scale,
                linear_scale,
            } => {
                let value = rgb[0].max(rgb[1]).max(rgb[2]);
                let scale = linear_scale * 255.0 / (tonemap_scale + value);
                rgb.map(|v| to_u8(scale * v))
            }
            Self::Filmic { white_scale } => {
                rgb.map(|v| to_u8(uncharted2(FILMIC_EXPOSURE_BIAS * v) * white_scale))
            }
            Self::Aces => rgb.map(|v| {
                const A: f32 = 2.51;
                const B: f32 = 0.03;
                const C: f32 = 2.43;
                const D: f32 = 0.59;
                const E: f32 = 0.14;
                let x = v / 255.0;
                to_u8(255.0 * (x * (A * x + B)) / (x * (C * x + D) + E))
            }),
        }
    }
}

fn uncharted2(x: f32) -> f32 {
    const A: f32 = 0.15;
    const B: f32 = 0.50;
    const C: f32 = 0.10;
    const D: f32 = 0.20;
    const E: f32 = 0.02;
    const F: f32 = 0.30;
    ((x * (A * x + C * B) + D * E) / (x * (A * x + B) + D * F)) - E / F
}

/// Tonemap `acc` to an 8-bit frame.
///
/// `max_possible` is the largest value the accumulator can hold and
/// `median` the brightness to preserve (Reinhard).
pub fn tonemap(
    acc: &Accumulator,
    algorithm: TonemapAlgorithm,
    max_possible: f32,
    median: f32,
) -> Result<Frame> {
    let op = Operator::resolve(algorithm, max_possible, median);
    let mut out = try_alloc::<u8>(acc.data.dim())?;
    let src = &acc.data;
    for_each_row_mut(&mut out, |y, mut row| {
        for x in 0..row.nrows() {
            let mapped = op.map([src[[y, x, 0]], src[[y, x, 1]], src[[y, x, 2]]]);
            row[[x, 0]] = mapped[0];
            row[[x, 1]] = mapped[1];
            row[[x, 2]] = mapped[2];
        }
    });
    Frame::new(out)
}
