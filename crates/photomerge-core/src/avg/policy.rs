use crate::consts::{
    AVG_GHOST_THRESHOLD_MAX, AVG_GHOST_THRESHOLD_MIN, AVG_WIENER_CUTOFF_FACTOR, AVG_WIENER_C_MAX,
    AVG_WIENER_C_MIN, AVG_ZOOM_EXTRA_LEVEL, SAMPLE_SIZE_2_EXPOSURE_NS, SAMPLE_SIZE_2_ISO,
    SAMPLE_SIZE_4_EXPOSURE_NS, SAMPLE_SIZE_4_ISO,
};
use crate::error::Result;
use crate::frame::Frame;
use crate::pipeline::config::{AlignConfig, GhostConfig};

/// Downsampling factor (1, 2 or 4) for an Avg burst. Higher ISO and
/// longer exposures trade resolution for throughput.
pub fn avg_sample_size(iso: u32, exposure_time_ns: u64) -> u32 {
    if iso >= SAMPLE_SIZE_4_ISO || exposure_time_ns >= SAMPLE_SIZE_4_EXPOSURE_NS {
        4
    } else if iso >= SAMPLE_SIZE_2_ISO || exposure_time_ns >= SAMPLE_SIZE_2_EXPOSURE_NS {
        2
    } else {
        1
    }
}

/// Downsample a frame by the chosen sample size before it enters a session.
pub fn prepare_frame(frame: Frame, sample_size: u32) -> Result<Frame> {
    if sample_size <= 1 {
        return Ok(frame);
    }
    frame.downsample(sample_size as usize)
}

/// Temporal Wiener constant and rejection cutoff `(C, cutoff)` for `iso`.
pub fn wiener_params(iso: u32) -> (f32, f32) {
    let c = (iso as f32 * 2.56).clamp(AVG_WIENER_C_MIN, AVG_WIENER_C_MAX);
    (c, c * AVG_WIENER_CUTOFF_FACTOR)
}

/// Ghost thresholds for merging a burst frame: noisier captures get a
/// wider tolerance.
pub fn ghost_config_for_iso(iso: u32) -> GhostConfig {
    GhostConfig {
        base_threshold: (AVG_GHOST_THRESHOLD_MIN + iso as f32 / 100.0).min(AVG_GHOST_THRESHOLD_MAX),
        ..GhostConfig::default()
    }
}

/// Zoomed captures magnify handheld shake, so search one level deeper.
pub fn alignment_for_zoom(base: &AlignConfig, zoom: f32) -> AlignConfig {
    let mut config = base.clone();
    if zoom > AVG_ZOOM_EXTRA_LEVEL {
        config.levels += 1;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_size_grows_with_iso_and_exposure() {
        assert_eq!(avg_sample_size(100, 10_000_000), 1);
        assert_eq!(avg_sample_size(1600, 10_000_000), 2);
        assert_eq!(avg_sample_size(100, 100_000_000), 2);
        assert_eq!(avg_sample_size(6400, 10_000_000), 4);
        assert_eq!(avg_sample_size(100, 500_000_000), 4);
    }

    #[test]
    fn wiener_constant_is_bounded() {
        assert_eq!(wiener_params(50).0, AVG_WIENER_C_MIN);
        assert_eq!(wiener_params(100_000).0, AVG_WIENER_C_MAX);
        let (c, cutoff) = wiener_params(400);
        assert!(cutoff > c);
    }

    #[test]
    fn zoom_adds_pyramid_level() {
        let base = AlignConfig::default();
        assert_eq!(alignment_for_zoom(&base, 1.0).levels, base.levels);
        assert_eq!(alignment_for_zoom(&base, 4.0).levels, base.levels + 1);
    }
}
