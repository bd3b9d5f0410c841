//! Linear camera response between two exposures of the same scene.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{RESPONSE_MAX, RESPONSE_MIN, RESPONSE_MIN_SAMPLES, RESPONSE_SAMPLE_STRIDE};
use crate::frame::Offset;

/// Maps a candidate's intensity onto the reference brightness scale:
/// `reference ≈ a * candidate + b`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseFunction {
    pub a: f32,
    pub b: f32,
}

impl Default for ResponseFunction {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ResponseFunction {
    pub const IDENTITY: ResponseFunction = ResponseFunction { a: 1.0, b: 0.0 };

    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        self.a * v + self.b
    }

    /// Least-squares fit over aligned pixel pairs where both samples are
    /// well exposed.
    ///
    /// Falls back to `fallback_ratio` (typically the exposure-time ratio
    /// reference/candidate), then to identity, when too few pairs qualify
    /// or the fit is degenerate.
    pub fn fit(
        reference: &Array2<f32>,
        candidate: &Array2<f32>,
        offset: Offset,
        fallback_ratio: Option<f32>,
    ) -> Self {
        let (h, w) = reference.dim();
        let mut n = 0usize;
        let (mut sx, mut sy, mut sxx, mut sxy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for y in (0..h).step_by(RESPONSE_SAMPLE_STRIDE) {
            for x in (0..w).step_by(RESPONSE_SAMPLE_STRIDE) {
                let Some((cx, cy)) = offset.source(x, y, w, h) else {
                    continue;
                };
                let r = reference[[y, x]];
                let c = candidate[[cy, cx]];
                if !(RESPONSE_MIN..=RESPONSE_MAX).contains(&r)
                    || !(RESPONSE_MIN..=RESPONSE_MAX).contains(&c)
                {
                    continue;
                }
                let (c, r) = (c as f64, r as f64);
                n += 1;
                sx += c;
                sy += r;
                sxx += c * c;
                sxy += c * r;
            }
        }

        let fallback = || match fallback_ratio {
            Some(ratio) if ratio.is_finite() && ratio > 0.0 => ResponseFunction { a: ratio, b: 0.0 },
            _ => ResponseFunction::IDENTITY,
        };

        if n < RESPONSE_MIN_SAMPLES {
            debug!(samples = n, "Too few samples for response fit");
            return fallback();
        }
        let nf = n as f64;
        let denom = nf * sxx - sx * sx;
        if denom.abs() < 1e-6 {
            return fallback();
        }
        let a = (nf * sxy - sx * sy) / denom;
        let b = (sy - a * sx) / nf;
        if !a.is_finite() || a <= 0.0 {
            return fallback();
        }
        ResponseFunction {
            a: a as f32,
            b: b as f32,
        }
    }
}
