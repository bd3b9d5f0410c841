mod common;

use approx::assert_abs_diff_eq;
use photomerge_core::error::{ErrorKind, MergeError};
use photomerge_core::frame::{CaptureMetadata, Frame, Offset};
use photomerge_core::hdr::{fold_order, fuse_hdr, well_exposedness, FusionOutput};
use photomerge_core::histogram::compute_histogram;
use photomerge_core::pipeline::config::{AlignMetric, HdrConfig, TonemapAlgorithm};
use photomerge_core::pipeline::CancelToken;
use photomerge_core::tonemap::TonemapParameters;

use common::{bracket, grey_frame, scene, shifted_bracket};

fn params(alpha: f32) -> TonemapParameters {
    TonemapParameters {
        alpha,
        ..TonemapParameters::default()
    }
}

fn fuse(frames: Vec<Frame>, alpha: f32) -> FusionOutput {
    let mut frames = frames;
    fuse_hdr(&mut frames, 1, &params(alpha), &HdrConfig::default(), &CancelToken::new()).unwrap()
}

// ---------------------------------------------------------------------------
// Weights and ordering
// ---------------------------------------------------------------------------

#[test]
fn test_well_exposedness_profile() {
    assert_eq!(well_exposedness(127.5), 1.0);
    assert_eq!(well_exposedness(40.0), 1.0);
    assert_eq!(well_exposedness(220.0), 1.0);
    assert_abs_diff_eq!(well_exposedness(0.0), 0.01, epsilon = 1e-6);
    assert_abs_diff_eq!(well_exposedness(255.0), 0.01, epsilon = 1e-6);
    assert!(well_exposedness(10.0) < well_exposedness(25.0));
}

#[test]
fn test_fold_order_by_exposure_time() {
    let make = |t: u64| grey_frame(8, 8, |_, _| 100.0).with_metadata(CaptureMetadata::new(100, t));
    let frames = vec![make(40), make(10), make(2), make(20), make(5)];
    let order = fold_order(&frames, 1);
    assert_eq!(order.brighter, vec![3, 0]);
    assert_eq!(order.darker, vec![4, 2]);
}

#[test]
fn test_fold_order_falls_back_to_brightness() {
    let frames = vec![
        grey_frame(8, 8, |_, _| 200.0),
        grey_frame(8, 8, |_, _| 100.0),
        grey_frame(8, 8, |_, _| 30.0),
    ];
    let order = fold_order(&frames, 1);
    assert_eq!(order.brighter, vec![0]);
    assert_eq!(order.darker, vec![2]);
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

#[test]
fn test_bracket_extends_dynamic_range() {
    let frames = bracket(128, 64);
    let reference_summary = compute_histogram(&frames[1]).summarize().unwrap();
    assert_eq!(reference_summary.max_nonzero_bin, 255);

    let out = fuse(frames, 0.0);
    assert_eq!(out.alignment.offsets, vec![Offset::ZERO, Offset::ZERO]);

    let summary = compute_histogram(&out.frame).summarize().unwrap();
    assert!(summary.min_nonzero_bin < 40, "min={}", summary.min_nonzero_bin);
    assert!(summary.max_nonzero_bin > 215, "max={}", summary.max_nonzero_bin);

    // Highlights that were clipped in the reference are recovered as a
    // gradient rather than a flat 255 plateau.
    let row = 32;
    let a = out.frame.pixel(110, row)[0];
    let b = out.frame.pixel(127, row)[0];
    assert!(a < b, "clipped region should keep detail: {a} vs {b}");
}

#[test]
fn test_shifted_bracket_is_aligned() {
    let frames = shifted_bracket(128, 64, [(2, -1), (0, 0), (-3, 2)]);
    let out = fuse(frames, 0.0);
    assert_eq!(out.alignment.offsets, vec![Offset::new(2, -1), Offset::new(-3, 2)]);
    assert!(out.alignment.confident.iter().all(|&c| c));
}

#[test]
fn test_response_recovers_exposure_ratio() {
    let out = fuse(bracket(128, 64), 0.0);
    // Candidates in original order: x0.25 exposure, then x4.
    assert_abs_diff_eq!(out.responses[0].a, 4.0, epsilon = 0.2);
    assert_abs_diff_eq!(out.responses[1].a, 0.25, epsilon = 0.02);
}

#[test]
fn test_static_bracket_has_no_ghosts() {
    let out = fuse(bracket(128, 64), 0.0);
    assert!(out.ghost_fractions.iter().all(|&g| g < 0.01), "{:?}", out.ghost_fractions);
}

#[test]
fn test_contrast_spread_grows_with_alpha() {
    let frames = bracket(128, 64);
    let mut last_spread = 0u8;
    for alpha in [0.0, 0.25, 0.5, 1.0] {
        let out = fuse(frames.clone(), alpha);
        let spread = compute_histogram(&out.frame).summarize().unwrap().spread();
        assert!(spread >= last_spread, "alpha {alpha}: {spread} < {last_spread}");
        last_spread = spread;
    }
}

#[test]
fn test_identical_frames_fuse_to_reference_tone() {
    let frame = grey_frame(64, 64, scene);
    let mut frames = vec![frame.clone(), frame.clone(), frame.clone()];
    let mut config = HdrConfig::default();
    config.alignment.metric = AlignMetric::Luminance;
    let out = fuse_hdr(
        &mut frames,
        1,
        &TonemapParameters {
            algorithm: TonemapAlgorithm::Clamp,
            ..params(0.0)
        },
        &config,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(out.frame.data, frame.data);
}

#[test]
fn test_frames_are_consumed_on_success() {
    let mut frames = bracket(64, 32);
    fuse_hdr(&mut frames, 1, &params(0.0), &HdrConfig::default(), &CancelToken::new()).unwrap();
    assert!(frames.is_empty());
}

#[test]
fn test_single_frame_runs_dro() {
    let frame = grey_frame(64, 64, scene);
    let mut frames = vec![frame.clone()];
    let out = fuse_hdr(&mut frames, 0, &params(0.0), &HdrConfig::default(), &CancelToken::new()).unwrap();
    assert!(out.alignment.offsets.is_empty());
    assert_eq!(out.frame.data, frame.data);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_empty_input_is_rejected() {
    let mut frames = Vec::new();
    let err = fuse_hdr(&mut frames, 0, &params(0.0), &HdrConfig::default(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, MergeError::EmptySequence));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_bad_reference_index_leaves_frames_untouched() {
    let mut frames = bracket(32, 32);
    let err = fuse_hdr(&mut frames, 3, &params(0.0), &HdrConfig::default(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, MergeError::InvalidParameter { name: "reference_index", .. }));
    assert_eq!(frames.len(), 3);
}

#[test]
fn test_alpha_out_of_range_is_rejected() {
    let mut frames = bracket(32, 32);
    let err = fuse_hdr(&mut frames, 1, &params(1.5), &HdrConfig::default(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, MergeError::InvalidParameter { name: "alpha", .. }));
    assert_eq!(frames.len(), 3);
}

#[test]
fn test_dimension_mismatch_leaves_frames_untouched() {
    let mut frames = bracket(32, 32);
    frames.push(grey_frame(32, 16, scene));
    let err = fuse_hdr(&mut frames, 1, &params(0.0), &HdrConfig::default(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, MergeError::DimensionMismatch { index: 3, .. }));
    assert_eq!(frames.len(), 4);
}

#[test]
fn test_cancelled_fusion_keeps_frames() {
    let mut frames = bracket(64, 32);
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = fuse_hdr(&mut frames, 1, &params(0.0), &HdrConfig::default(), &cancel).unwrap_err();
    assert!(matches!(err, MergeError::Cancelled));
    assert_eq!(err.kind(), ErrorKind::ProcessingFailed);
    assert_eq!(frames.len(), 3);
}
