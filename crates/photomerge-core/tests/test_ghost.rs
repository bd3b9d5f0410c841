mod common;

use approx::assert_abs_diff_eq;
use photomerge_core::frame::{Frame, LuminanceProxy, Offset};
use photomerge_core::ghost::{detect_ghosts, detect_ghosts_mapped, GhostMask};
use photomerge_core::pipeline::config::GhostConfig;
use photomerge_core::response::ResponseFunction;

use common::{grey_frame, noise, scene, shifted_scene};

fn with_square(base: &Frame, x0: usize, y0: usize, size: usize, value: u8) -> Frame {
    let mut frame = base.clone();
    for y in y0..y0 + size {
        for x in x0..x0 + size {
            for c in 0..3 {
                frame.data[[y, x, c]] = value;
            }
        }
    }
    frame
}

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

#[test]
fn test_identical_frames_have_no_ghosts() {
    let frame = grey_frame(64, 64, scene);
    let mask = detect_ghosts(&frame, &frame, Offset::ZERO, &GhostConfig::default()).unwrap();
    assert_eq!(mask.ghost_fraction(), 0.0);
    assert!(mask.weights.iter().all(|&w| w == 1.0));
}

#[test]
fn test_moved_object_is_flagged() {
    let background = Frame::from_fn(64, 64, |_, _| [100, 100, 100]).unwrap();
    let reference = with_square(&background, 10, 10, 12, 220);
    let candidate = with_square(&background, 40, 30, 12, 220);
    let mask = detect_ghosts(&reference, &candidate, Offset::ZERO, &GhostConfig::default()).unwrap();

    // Interior of both squares: object in one frame, background in the other.
    assert!(mask.is_ghost(15, 15));
    assert!(mask.is_ghost(45, 35));
    assert_eq!(mask.weight(15, 15), 0.0);
    // Untouched background.
    assert!(!mask.is_ghost(2, 60));
    assert_eq!(mask.weight(2, 60), 1.0);
}

#[test]
fn test_noise_is_not_flagged() {
    let reference = grey_frame(64, 64, |x, y| 128.0 + 4.0 * noise(x as usize, y as usize, 1));
    let candidate = grey_frame(64, 64, |x, y| 128.0 + 4.0 * noise(x as usize, y as usize, 2));
    let mask = detect_ghosts(&reference, &candidate, Offset::ZERO, &GhostConfig::default()).unwrap();
    assert_eq!(mask.ghost_fraction(), 0.0);
}

#[test]
fn test_offset_is_applied_before_comparing() {
    let reference = shifted_scene(64, 64, 0, 0);
    let candidate = shifted_scene(64, 64, 5, 0);
    let config = GhostConfig {
        base_threshold: 2.0,
        contrast_factor: 0.0,
        ..GhostConfig::default()
    };
    let aligned = detect_ghosts(&reference, &candidate, Offset::new(5, 0), &config).unwrap();
    assert_eq!(aligned.ghost_fraction(), 0.0);
}

#[test]
fn test_partial_weight_between_thresholds() {
    let reference = Frame::from_fn(8, 8, |_, _| [100, 100, 100]).unwrap();
    let candidate = Frame::from_fn(8, 8, |_, _| [136, 136, 136]).unwrap();
    let config = GhostConfig {
        base_threshold: 24.0,
        contrast_factor: 0.0,
        ..GhostConfig::default()
    };
    let mask = detect_ghosts(&reference, &candidate, Offset::ZERO, &config).unwrap();
    // diff 36 with threshold 24: 2 - 36/24 = 0.5
    assert_abs_diff_eq!(mask.weight(4, 4), 0.5, epsilon = 1e-5);
}

// ---------------------------------------------------------------------------
// Clipping and exposure mapping
// ---------------------------------------------------------------------------

#[test]
fn test_clipped_samples_are_never_flagged() {
    let reference = Frame::from_fn(16, 16, |_, _| [255, 255, 255]).unwrap();
    let candidate = Frame::from_fn(16, 16, |_, _| [90, 90, 90]).unwrap();
    let mask = detect_ghosts(&reference, &candidate, Offset::ZERO, &GhostConfig::default()).unwrap();
    assert_eq!(mask.ghost_fraction(), 0.0);
}

#[test]
fn test_response_maps_exposures_before_comparing() {
    let reference = grey_frame(64, 64, |x, y| scene(x, y) * 0.8);
    let darker = grey_frame(64, 64, |x, y| scene(x, y) * 0.4);
    let ref_plane = reference.luminance_plane(LuminanceProxy::Average);
    let dark_plane = darker.luminance_plane(LuminanceProxy::Average);
    let config = GhostConfig::default();

    let unmapped =
        detect_ghosts_mapped(&ref_plane, &dark_plane, Offset::ZERO, ResponseFunction::IDENTITY, &config)
            .unwrap();
    assert!(unmapped.ghost_fraction() > 0.5);

    let response = ResponseFunction { a: 2.0, b: 0.0 };
    let mapped = detect_ghosts_mapped(&ref_plane, &dark_plane, Offset::ZERO, response, &config).unwrap();
    assert_eq!(mapped.ghost_fraction(), 0.0);
}

#[test]
fn test_clear_mask_keeps_everything() {
    let mask = GhostMask::clear(10, 5);
    assert_eq!(mask.width(), 10);
    assert_eq!(mask.height(), 5);
    assert_eq!(mask.ghost_fraction(), 0.0);
}
