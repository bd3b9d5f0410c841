use std::sync::Arc;

use tracing::info;

use crate::accumulator::Accumulator;
use crate::avg::{finish_accumulator, AvgSession};
use crate::consts::{DEFAULT_EXPOSURE_NS, DEFAULT_ISO};
use crate::error::{MergeError, Result};
use crate::frame::{CaptureMetadata, Frame, Offset};
use crate::hdr::fuse_hdr;
use crate::histogram::compute_histogram;
use crate::tonemap::{dro, TonemapParameters};

use super::cancel::CancelToken;
use super::config::MergeConfig;
use super::types::{MergeOutput, MergeStage, ProgressReporter};

fn with_diagnostics(frame: Frame, offsets: Vec<Offset>, reporter: &Arc<dyn ProgressReporter>) -> MergeOutput {
    reporter.begin_stage(MergeStage::Analyzing, None);
    let histogram = compute_histogram(&frame);
    let summary = histogram.summarize();
    reporter.finish_stage();
    MergeOutput {
        frame,
        offsets,
        histogram,
        summary,
    }
}

/// Fuse an exposure bracket. A single frame goes through DRO instead.
///
/// On success `frames` is drained. On error the frames not yet folded are
/// left in it, so the caller can retry or fall back to one of them.
pub fn run_hdr(
    frames: &mut Vec<Frame>,
    reference_index: usize,
    config: &MergeConfig,
    cancel: &CancelToken,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MergeOutput> {
    let n = frames.len();
    let exposure = frames
        .get(reference_index)
        .and_then(|f| f.metadata.exposure_time_ns);
    let params = TonemapParameters::from_config(config, exposure, n);
    info!(
        frames = n,
        reference = reference_index,
        algorithm = %params.algorithm,
        alpha = params.alpha,
        "Running HDR merge"
    );

    reporter.begin_stage(MergeStage::Fusing, Some(n));
    let fused = fuse_hdr(frames, reference_index, &params, &config.hdr, cancel)?;
    reporter.advance(n);
    reporter.finish_stage();

    let mut offsets = fused.alignment.offsets;
    if n > 1 {
        offsets.insert(reference_index, Offset::ZERO);
    }
    Ok(with_diagnostics(fused.frame, offsets, &reporter))
}

/// Single-frame dynamic range optimization with the configured alpha.
pub fn run_dro(frame: Frame, config: &MergeConfig, reporter: Arc<dyn ProgressReporter>) -> Result<MergeOutput> {
    info!(
        algorithm = %config.dro_algorithm,
        alpha = config.always_alpha,
        "Running DRO"
    );
    reporter.begin_stage(MergeStage::Tonemapping, Some(1));
    let out = dro(&frame, config.dro_algorithm, config.always_alpha, config.hdr.contrast_tiles)?;
    drop(frame);
    reporter.advance(1);
    reporter.finish_stage();
    Ok(with_diagnostics(out, vec![Offset::ZERO], &reporter))
}

/// Average a burst through a streaming session, in input order. Frame `i`
/// is folded with weight `i`, giving a running mean.
pub fn run_avg(
    frames: Vec<Frame>,
    config: &MergeConfig,
    cancel: &CancelToken,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MergeOutput> {
    let n = frames.len();
    let mut frames = frames.into_iter();
    let first = frames.next().ok_or(MergeError::EmptySequence)?;
    let (width, height) = (first.width(), first.height());
    let iso = first.metadata.iso.unwrap_or(DEFAULT_ISO);
    let exposure = first.metadata.exposure_time_ns.unwrap_or(DEFAULT_EXPOSURE_NS);
    info!(frames = n, iso, exposure_time_ns = exposure, "Running Avg merge");

    let Some(second) = frames.next() else {
        cancel.check()?;
        let acc = Accumulator::from_frame(&first)?;
        drop(first);
        let out = finish_accumulator(acc, CaptureMetadata::new(iso, exposure), 0.0, &config.avg)?;
        return Ok(with_diagnostics(out, vec![Offset::ZERO], &reporter));
    };

    reporter.begin_stage(MergeStage::Averaging, Some(n));
    let mut session = AvgSession::begin_with_cancel(
        first,
        second,
        1.0,
        iso,
        exposure,
        1.0,
        &config.avg,
        cancel.clone(),
    )?;
    reporter.advance(2);
    for (i, frame) in frames.enumerate() {
        let index = i + 2;
        session.update(width, height, frame, index as f32, iso, exposure, 1.0)?;
        reporter.advance(index + 1);
    }
    reporter.finish_stage();

    reporter.begin_stage(MergeStage::Finishing, None);
    let out = session.finish(width, height, iso, exposure)?;
    reporter.finish_stage();
    let offsets = session.offsets().to_vec();
    Ok(with_diagnostics(out, offsets, &reporter))
}
