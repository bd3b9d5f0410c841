use tracing::{debug, info, warn};

use crate::accumulator::Accumulator;
use crate::align::align_planes;
use crate::consts::AVG_WIENER_CUTOFF_FACTOR;
use crate::error::{MergeError, Result};
use crate::frame::{CaptureMetadata, Frame, LuminanceProxy, Offset};
use crate::ghost::detect_ghosts_mapped;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::config::AvgConfig;
use crate::response::ResponseFunction;

use super::merge::{finish_accumulator, merge_frame, NoiseEstimate, Wiener};
use super::policy::{alignment_for_zoom, ghost_config_for_iso, wiener_params};

/// A frame [`AvgSession::update`] refused to fold, handed back with the
/// reason so the caller can retry or fall back to it.
#[derive(Debug, thiserror::Error)]
#[error("Burst frame rejected: {error}")]
pub struct RejectedFrame {
    #[source]
    pub error: MergeError,
    pub frame: Frame,
}

impl From<RejectedFrame> for MergeError {
    fn from(rejected: RejectedFrame) -> Self {
        rejected.error
    }
}

/// A streaming average over a burst.
///
/// Created from the first two frames by [`AvgSession::begin`], fed one
/// frame at a time by [`AvgSession::update`] and closed by
/// [`AvgSession::finish`]. Every frame is consumed by the call that folds
/// it; a frame that is rejected instead comes back in [`RejectedFrame`].
/// Once finished or cancelled the accumulator is released and all
/// further calls fail with [`MergeError::SessionClosed`].
#[derive(Debug)]
pub struct AvgSession {
    acc: Option<Accumulator>,
    config: AvgConfig,
    cancel: CancelToken,
    offsets: Vec<Offset>,
    noise: NoiseEstimate,
    width: usize,
    height: usize,
}

impl AvgSession {
    /// Start a session from `frame0`, then fold `frame1` with `weight1`.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        frame0: Frame,
        frame1: Frame,
        weight1: f32,
        iso: u32,
        exposure_time_ns: u64,
        zoom: f32,
        config: &AvgConfig,
    ) -> Result<Self> {
        Self::begin_with_cancel(
            frame0,
            frame1,
            weight1,
            iso,
            exposure_time_ns,
            zoom,
            config,
            CancelToken::new(),
        )
    }

    /// [`AvgSession::begin`] with a token checked before each fold.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_with_cancel(
        frame0: Frame,
        frame1: Frame,
        weight1: f32,
        iso: u32,
        exposure_time_ns: u64,
        zoom: f32,
        config: &AvgConfig,
        cancel: CancelToken,
    ) -> Result<Self> {
        let (width, height) = (frame0.width(), frame0.height());
        if !frame1.same_dimensions(&frame0) {
            return Err(MergeError::DimensionMismatch {
                index: 1,
                expected_width: width,
                expected_height: height,
                actual_width: frame1.width(),
                actual_height: frame1.height(),
            });
        }
        info!(width, height, iso, exposure_time_ns, "Starting Avg session");

        let acc = Accumulator::from_frame(&frame0)?;
        drop(frame0);
        let mut session = Self {
            acc: Some(acc),
            config: config.clone(),
            cancel,
            offsets: vec![Offset::ZERO],
            noise: NoiseEstimate::default(),
            width,
            height,
        };
        session.update(width, height, frame1, weight1, iso, exposure_time_ns, zoom)?;
        Ok(session)
    }

    /// Fold `frame` as the sample following `weight` earlier ones.
    ///
    /// The frame is aligned to the current accumulator content rather than
    /// the first frame, so slow drift over a long burst is tracked.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        width: usize,
        height: usize,
        frame: Frame,
        weight: f32,
        iso: u32,
        exposure_time_ns: u64,
        zoom: f32,
    ) -> std::result::Result<(), RejectedFrame> {
        self.fold(width, height, &frame, weight, iso, exposure_time_ns, zoom)
            .map_err(|error| RejectedFrame { error, frame })
    }

    #[allow(clippy::too_many_arguments)]
    fn fold(
        &mut self,
        width: usize,
        height: usize,
        frame: &Frame,
        weight: f32,
        iso: u32,
        exposure_time_ns: u64,
        zoom: f32,
    ) -> Result<()> {
        self.check_open()?;
        self.check_dimensions(width, height, frame)?;
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(MergeError::invalid("weight", format!("{weight} must be finite and non-negative")));
        }
        if self.cancel.is_cancelled() {
            self.close();
            return Err(MergeError::Cancelled);
        }
        let acc = self.acc.as_mut().ok_or(MergeError::SessionClosed)?;

        let align_config = alignment_for_zoom(&self.config.alignment, zoom);
        let alignment = align_planes(
            &acc.luminance_plane(LuminanceProxy::Max),
            &[frame.luminance_plane(LuminanceProxy::Max)],
            &align_config,
        )?;
        let offset = alignment.offsets.first().copied().unwrap_or(Offset::ZERO);
        if alignment.confident.first() == Some(&false) {
            warn!(frame = self.offsets.len(), "Frame could not be aligned, merging unshifted");
        }

        let acc_plane = acc.luminance_plane(LuminanceProxy::Average);
        let frame_plane = frame.luminance_plane(LuminanceProxy::Average);
        let mask = detect_ghosts_mapped(
            &acc_plane,
            &frame_plane,
            offset,
            ResponseFunction::IDENTITY,
            &ghost_config_for_iso(iso),
        )?;
        self.noise.add_frame(&acc_plane, &frame_plane, offset, &mask);

        let (c, cutoff) = match self.config.wiener_c {
            Some(c) => (c, c * AVG_WIENER_CUTOFF_FACTOR),
            None => wiener_params(iso),
        };
        let wiener = Wiener { c, cutoff };
        merge_frame(acc, frame, weight, offset, &mask, wiener);
        debug!(
            frame = self.offsets.len(),
            %offset,
            weight,
            exposure_time_ns,
            ghosts = mask.ghost_fraction(),
            noise = self.noise.level(),
            "Merged burst frame"
        );
        self.offsets.push(offset);
        Ok(())
    }

    /// Convert the accumulator to the output frame, releasing it. A burst
    /// that was measurably noisy is denoised and black-level corrected
    /// first.
    pub fn finish(&mut self, width: usize, height: usize, iso: u32, exposure_time_ns: u64) -> Result<Frame> {
        self.check_open()?;
        if (width, height) != (self.width, self.height) {
            return Err(self.mismatch(width, height));
        }
        if self.cancel.is_cancelled() {
            self.close();
            return Err(MergeError::Cancelled);
        }
        let acc = self.acc.take().ok_or(MergeError::SessionClosed)?;
        info!(frames = self.offsets.len(), noise = self.noise.level(), "Finishing Avg session");
        finish_accumulator(
            acc,
            CaptureMetadata::new(iso, exposure_time_ns),
            self.noise.level(),
            &self.config,
        )
    }

    /// Offset applied to every frame folded so far; the first is always
    /// (0, 0).
    pub fn offsets(&self) -> &[Offset] {
        &self.offsets
    }

    /// Mean absolute temporal difference measured over the frames folded
    /// so far, on the 8-bit scale.
    pub fn noise_level(&self) -> f32 {
        self.noise.level()
    }

    pub fn frames_merged(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_open(&self) -> bool {
        self.acc.is_some()
    }

    /// Release the accumulator without producing output.
    pub fn close(&mut self) {
        if self.acc.take().is_some() {
            debug!("Avg session closed");
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.acc.is_none() {
            return Err(MergeError::SessionClosed);
        }
        Ok(())
    }

    fn check_dimensions(&self, width: usize, height: usize, frame: &Frame) -> Result<()> {
        if (width, height) != (self.width, self.height) {
            return Err(self.mismatch(width, height));
        }
        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(self.mismatch(frame.width(), frame.height()));
        }
        Ok(())
    }

    fn mismatch(&self, width: usize, height: usize) -> MergeError {
        MergeError::DimensionMismatch {
            index: self.offsets.len(),
            expected_width: self.width,
            expected_height: self.height,
            actual_width: width,
            actual_height: height,
        }
    }
}
