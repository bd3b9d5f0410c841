mod common;

use approx::assert_abs_diff_eq;
use photomerge_core::accumulator::Accumulator;
use photomerge_core::error::MergeError;
use photomerge_core::frame::{CaptureMetadata, Frame};
use photomerge_core::histogram::{compute_histogram, HistogramSummary};
use photomerge_core::pipeline::config::{ContrastEnhancement, DroAlgorithm, TonemapAlgorithm};
use photomerge_core::tonemap::{
    apply_gain_gamma, compensate_black_level, compute_brighten_factors, dro, dro_factors, enhance_local_contrast,
    hdr_alpha, tonemap, BrightenFactors, TonemapParameters,
};

use common::{grey_frame, scene};

const SHORT: u64 = 10_000_000;
const LONG: u64 = 50_000_000;

fn ramp_accumulator(width: usize, max: f32) -> Accumulator {
    let frame = Frame::from_fn(width, 1, |_, _| [0, 0, 0]).unwrap();
    let mut acc = Accumulator::from_frame(&frame).unwrap();
    for x in 0..width {
        let v = max * x as f32 / (width - 1) as f32;
        for c in 0..3 {
            acc.data[[0, x, c]] = v;
        }
    }
    acc
}

// ---------------------------------------------------------------------------
// Global operators
// ---------------------------------------------------------------------------

#[test]
fn test_all_operators_are_monotonic_and_bounded() {
    let acc = ramp_accumulator(256, 1000.0);
    for algorithm in [
        TonemapAlgorithm::Clamp,
        TonemapAlgorithm::Exponential,
        TonemapAlgorithm::Reinhard,
        TonemapAlgorithm::Filmic,
        TonemapAlgorithm::Aces,
    ] {
        let out = tonemap(&acc, algorithm, 1000.0, 100.0).unwrap();
        let mut last = 0u8;
        for x in 0..256 {
            let v = out.pixel(x, 0)[0];
            assert!(v >= last, "{algorithm} not monotonic at {x}");
            last = v;
        }
        assert_eq!(out.pixel(0, 0)[0], 0, "{algorithm}");
    }
}

#[test]
fn test_reinhard_preserves_median_and_maps_max_to_white() {
    let acc = ramp_accumulator(1001, 1000.0);
    let out = tonemap(&acc, TonemapAlgorithm::Reinhard, 1000.0, 100.0).unwrap();
    // Column x holds value x.
    assert_eq!(out.pixel(100, 0)[0], 100);
    assert_eq!(out.pixel(1000, 0)[0], 255);
}

#[test]
fn test_reinhard_without_headroom_is_clamp() {
    let acc = ramp_accumulator(256, 255.0);
    let reinhard = tonemap(&acc, TonemapAlgorithm::Reinhard, 255.0, 100.0).unwrap();
    let clamp = tonemap(&acc, TonemapAlgorithm::Clamp, 255.0, 100.0).unwrap();
    assert_eq!(reinhard.data, clamp.data);
}

#[test]
fn test_tonemap_is_deterministic() {
    let acc = ramp_accumulator(300, 700.0);
    let a = tonemap(&acc, TonemapAlgorithm::Filmic, 700.0, 80.0).unwrap();
    let b = tonemap(&acc, TonemapAlgorithm::Filmic, 700.0, 80.0).unwrap();
    assert_eq!(a.data, b.data);
}

// ---------------------------------------------------------------------------
// Local contrast
// ---------------------------------------------------------------------------

#[test]
fn test_local_contrast_alpha_zero_is_identity() {
    let frame = grey_frame(64, 64, scene);
    let out = enhance_local_contrast(&frame, 0.0, 8).unwrap();
    assert_eq!(out.data, frame.data);
}

#[test]
fn test_local_contrast_rejects_bad_alpha() {
    let frame = grey_frame(16, 16, scene);
    let err = enhance_local_contrast(&frame, -0.1, 8).unwrap_err();
    assert!(matches!(err, MergeError::InvalidParameter { name: "alpha", .. }));
}

#[test]
fn test_local_contrast_widens_narrow_histogram() {
    let frame = grey_frame(128, 128, |x, y| 100.0 + 0.2 * (x + y) / 2.0);
    let before = compute_histogram(&frame).summarize().unwrap();
    let out = enhance_local_contrast(&frame, 1.0, 4).unwrap();
    let after = compute_histogram(&out).summarize().unwrap();
    assert!(after.spread() > before.spread());
}

#[test]
fn test_local_contrast_keeps_black() {
    let frame = Frame::from_fn(64, 64, |x, _| if x < 32 { [0, 0, 0] } else { [120, 60, 30] }).unwrap();
    let out = enhance_local_contrast(&frame, 0.7, 4).unwrap();
    assert_eq!(out.pixel(5, 5), [0, 0, 0]);
}

// ---------------------------------------------------------------------------
// DRO
// ---------------------------------------------------------------------------

#[test]
fn test_dro_alpha_zero_is_identity_and_deterministic() {
    let frame = grey_frame(64, 64, |x, y| scene(x, y) * 0.5);
    let a = dro(&frame, DroAlgorithm::GainGamma, 0.0, 8).unwrap();
    let b = dro(&frame, DroAlgorithm::GainGamma, 0.0, 8).unwrap();
    assert_eq!(a.data, frame.data);
    assert_eq!(a.data, b.data);
}

#[test]
fn test_dro_brightens_dark_frame() {
    let frame = grey_frame(64, 64, |x, y| scene(x, y) * 0.4)
        .with_metadata(CaptureMetadata::new(800, LONG));
    let out = dro(&frame, DroAlgorithm::GainGamma, 1.0, 8).unwrap();
    let before = compute_histogram(&frame).summarize().unwrap();
    let after = compute_histogram(&out).summarize().unwrap();
    assert!(after.median_bin > before.median_bin);
}

#[test]
fn test_dro_none_only_applies_local_contrast() {
    let frame = grey_frame(32, 32, scene);
    let out = dro(&frame, DroAlgorithm::None, 0.0, 8).unwrap();
    assert_eq!(out.data, frame.data);
}

#[test]
fn test_brighten_factors_target_dim_median() {
    let summary = HistogramSummary {
        min_nonzero_bin: 10,
        median_bin: 60,
        max_nonzero_bin: 100,
    };
    let factors = compute_brighten_factors(&summary, &CaptureMetadata::new(800, LONG), 4.0);
    // 119 / 60 is below the cap and 100 * gain stays under 255.
    assert_abs_diff_eq!(factors.gain, 119.0 / 60.0, epsilon = 1e-5);
    assert_eq!(factors.gamma, 1.0);
}

#[test]
fn test_brighten_factors_use_gamma_when_gain_would_clip() {
    let summary = HistogramSummary {
        min_nonzero_bin: 10,
        median_bin: 60,
        max_nonzero_bin: 200,
    };
    let factors = compute_brighten_factors(&summary, &CaptureMetadata::new(100, SHORT), 4.0);
    assert_abs_diff_eq!(factors.gain, 255.0 / 200.0, epsilon = 1e-5);
    assert!(factors.gamma < 1.0);
}

#[test]
fn test_bright_median_needs_no_gain() {
    let summary = HistogramSummary {
        min_nonzero_bin: 150,
        median_bin: 210,
        max_nonzero_bin: 250,
    };
    let factors = compute_brighten_factors(&summary, &CaptureMetadata::new(100, SHORT), 4.0);
    assert!(factors.is_identity());
}

#[test]
fn test_zero_black_level_needs_no_compensation() {
    let summary = HistogramSummary {
        min_nonzero_bin: 10,
        median_bin: 60,
        max_nonzero_bin: 100,
    };
    assert!(compensate_black_level(&summary, 0.0, 4.0).is_identity());
}

#[test]
fn test_black_level_compensation_keeps_median() {
    let summary = HistogramSummary {
        min_nonzero_bin: 20,
        median_bin: 120,
        max_nonzero_bin: 200,
    };
    let factors = compensate_black_level(&summary, 16.0, 4.0);
    assert_eq!(factors.black_level, 16.0);
    assert!(factors.gain > 1.0);
    assert_eq!(factors.gamma, 1.0);

    let frame = Frame::from_fn(3, 1, |x, _| {
        let v = [20, 120, 200][x];
        [v, v, v]
    })
    .unwrap();
    let out = apply_gain_gamma(&frame, &factors).unwrap();
    assert!(out.pixel(0, 0)[0] < 10, "shadow {}", out.pixel(0, 0)[0]);
    assert!((out.pixel(1, 0)[0] as i32 - 120).abs() <= 1, "median {}", out.pixel(1, 0)[0]);
    assert!(out.pixel(2, 0)[0] > 200, "highlight {}", out.pixel(2, 0)[0]);
}

#[test]
fn test_dro_factors_lift_shadows() {
    let summary = HistogramSummary {
        min_nonzero_bin: 0,
        median_bin: 119,
        max_nonzero_bin: 255,
    };
    let factors = dro_factors(&summary, &CaptureMetadata::default());
    assert_eq!(factors.gain, 1.0);
    assert!(factors.gamma < 1.0);
}

#[test]
fn test_gain_gamma_identity_returns_input() {
    let frame = grey_frame(16, 16, scene);
    let out = apply_gain_gamma(&frame, &BrightenFactors::IDENTITY).unwrap();
    assert_eq!(out.data, frame.data);
}

#[test]
fn test_gain_doubles_values() {
    let frame = Frame::from_fn(4, 4, |_, _| [20, 40, 60]).unwrap();
    let factors = BrightenFactors {
        gain: 2.0,
        ..BrightenFactors::IDENTITY
    };
    let out = apply_gain_gamma(&frame, &factors).unwrap();
    assert_eq!(out.pixel(1, 1), [40, 80, 120]);
}

#[test]
fn test_scaled_factors_interpolate_to_identity() {
    let factors = BrightenFactors {
        gain: 3.0,
        gamma: 0.5,
        black_level: 10.0,
    };
    assert!(factors.scaled(0.0).is_identity());
    assert_eq!(factors.scaled(1.0), factors);
    assert_eq!(factors.scaled(0.5).gain, 2.0);
}

// ---------------------------------------------------------------------------
// Contrast enhancement policy
// ---------------------------------------------------------------------------

#[test]
fn test_hdr_alpha_modes() {
    assert_eq!(hdr_alpha(ContrastEnhancement::Off, Some(SHORT), 3, 0.5), 0.0);
    assert_eq!(hdr_alpha(ContrastEnhancement::Always, Some(LONG), 3, 0.7), 0.7);
    assert_eq!(hdr_alpha(ContrastEnhancement::Smart, Some(LONG), 3, 0.5), 0.0);
    assert_eq!(hdr_alpha(ContrastEnhancement::Smart, None, 3, 0.5), 0.0);
    assert_abs_diff_eq!(hdr_alpha(ContrastEnhancement::Smart, Some(SHORT), 3, 0.5), 0.5, epsilon = 1e-6);
}

#[test]
fn test_smart_alpha_grows_with_frames_within_bounds() {
    let a3 = hdr_alpha(ContrastEnhancement::Smart, Some(SHORT), 3, 0.5);
    let a5 = hdr_alpha(ContrastEnhancement::Smart, Some(SHORT), 5, 0.5);
    let a9 = hdr_alpha(ContrastEnhancement::Smart, Some(SHORT), 9, 0.5);
    let a2 = hdr_alpha(ContrastEnhancement::Smart, Some(SHORT), 2, 0.5);
    assert!(a5 > a3);
    assert_abs_diff_eq!(a9, 0.8, epsilon = 1e-6);
    assert_abs_diff_eq!(a2, 0.4, epsilon = 1e-6);
}

#[test]
fn test_single_frame_uses_configured_alpha() {
    assert_eq!(hdr_alpha(ContrastEnhancement::Off, Some(SHORT), 1, 0.6), 0.6);
}

#[test]
fn test_parameters_validate_alpha() {
    let params = TonemapParameters {
        alpha: 2.0,
        ..TonemapParameters::default()
    };
    assert!(params.validate().is_err());
    assert!(TonemapParameters::default().validate().is_ok());
}
