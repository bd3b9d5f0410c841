/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum candidate count to align frames in parallel.
pub const PARALLEL_FRAME_THRESHOLD: usize = 2;

/// Number of histogram bins (one per 8-bit value).
pub const HISTOGRAM_BINS: usize = 256;

/// Number of channels in a frame (R, G, B).
pub const CHANNEL_COUNT: usize = 3;

/// Mid-grey on the 8-bit scale.
pub const MID_GREY: f32 = 127.5;

/// Exposure time (ns) below which a capture counts as "short": 1/59 s.
pub const SHORT_EXPOSURE_NS: u64 = 1_000_000_000 / 59;

/// ISO below which a capture counts as low-noise.
pub const LOW_ISO: u32 = 1100;

/// ISO at and above which a noisy Avg burst gets spatial denoise and
/// black-level removal when finished.
pub const NOISY_ISO: u32 = 700;

/// Default number of pyramid levels below full resolution.
pub const DEFAULT_PYRAMID_LEVELS: usize = 3;

/// Smallest side (pixels) the coarsest pyramid level may have.
pub const MIN_PYRAMID_SIZE: usize = 16;

/// Default search radius at the coarsest pyramid level.
pub const DEFAULT_COARSE_RADIUS: i32 = 4;

/// Default refinement radius at each finer pyramid level.
pub const DEFAULT_REFINE_RADIUS: i32 = 2;

/// Mean absolute luminance difference above which an alignment is rejected.
pub const DEFAULT_LUMINANCE_MAX_ERROR: f32 = 48.0;

/// Bitmap mismatch fraction above which an MTB alignment is rejected.
pub const DEFAULT_MTB_MAX_ERROR: f32 = 0.35;

/// Half-width, for a frame whose median is mid-grey, of the band around
/// the median over which an MTB bitmap ramps from 0 to 1. Scales with the
/// median so the bitmap does not depend on exposure.
pub const DEFAULT_MTB_BAND: f32 = 4.0;

/// Floor for the scaled MTB band, so very dark frames still get a ramp.
pub const MIN_MTB_BAND: f32 = 0.5;

/// Bound on the brightness ratio estimated from medians when a bracket
/// frame has no exposure time.
pub const MAX_EXPOSURE_GAIN: f32 = 64.0;

/// Half-width of the well-exposed band around mid-grey used by HDR weights.
pub const HDR_SAFE_RANGE: f32 = 96.0;

/// Weight given to fully clipped (0 or 255) samples in HDR fusion.
pub const HDR_MIN_WEIGHT: f32 = 0.01;

/// Sample range used when fitting response functions between brackets.
pub const RESPONSE_MIN: f32 = 16.0;
pub const RESPONSE_MAX: f32 = 240.0;

/// Minimum number of pixel pairs for a least-squares response fit.
pub const RESPONSE_MIN_SAMPLES: usize = 64;

/// Pixel stride used when sampling pairs for the response fit.
pub const RESPONSE_SAMPLE_STRIDE: usize = 2;

/// Default number of tiles per side for local contrast enhancement.
pub const DEFAULT_CONTRAST_TILES: usize = 8;

/// Smallest tile side (pixels) for local contrast enhancement.
pub const MIN_CONTRAST_TILE: usize = 16;

/// Default alpha for "always" contrast enhancement and single-frame DRO.
pub const DEFAULT_CONTRAST_ALPHA: f32 = 0.5;

/// Ideal median brightness for dim scenes.
pub const IDEAL_BRIGHTNESS_DIM: f32 = 119.0;

/// Ideal median brightness for bright, short-exposure, low-ISO scenes.
pub const IDEAL_BRIGHTNESS_BRIGHT: f32 = 199.0;

/// Brightest bin below which shadows are lifted by the DRO gamma.
pub const SHADOW_KNEE: f32 = 64.0;

/// Largest gamma reduction applied for fully black shadows.
pub const MAX_SHADOW_LIFT: f32 = 0.25;

/// Largest black level subtracted by the Avg finish pass.
pub const MAX_BLACK_LEVEL: f32 = 16.0;

/// Wiener constant used by the spatial denoise filter in the finish pass.
pub const SPATIAL_WIENER_C: f32 = 64.0 * 64.0 / 8.0;

/// Largest gain the Avg finish pass may apply to restore the median after
/// black-level removal.
pub const AVG_MAX_GAIN: f32 = 4.0;

/// Largest gain single-frame DRO may apply.
pub const DRO_MAX_GAIN: f32 = 1.5;

/// Smallest gamma used to reach the brightness target.
pub const MIN_GAMMA: f32 = 0.5;

/// Temporal Wiener constant bounds for Avg merging. Smaller values filter
/// more strongly (less averaging).
pub const AVG_WIENER_C_MIN: f32 = 256.0;
pub const AVG_WIENER_C_MAX: f32 = 4096.0;

/// Squared RGB difference, as a multiple of the Wiener constant, beyond
/// which a new sample is rejected outright.
pub const AVG_WIENER_CUTOFF_FACTOR: f32 = 8.0;

/// Ghost threshold bounds for Avg merging; noisier captures tolerate more.
pub const AVG_GHOST_THRESHOLD_MIN: f32 = 16.0;
pub const AVG_GHOST_THRESHOLD_MAX: f32 = 64.0;

/// Mean absolute temporal difference (8-bit luminance) at or below which a
/// burst counts as noise-free and finishing leaves it unchanged.
pub const AVG_NOISE_FLOOR: f32 = 1.0;

/// Fraction of darkest pixels used to estimate the black level.
pub const BLACK_LEVEL_PERCENTILE: f32 = 0.001;

/// ISO thresholds for Avg downsampling.
pub const SAMPLE_SIZE_2_ISO: u32 = 1100;
pub const SAMPLE_SIZE_4_ISO: u32 = 3200;

/// Exposure thresholds (ns) for Avg downsampling: 1/20 s and 1/4 s.
pub const SAMPLE_SIZE_2_EXPOSURE_NS: u64 = 1_000_000_000 / 20;
pub const SAMPLE_SIZE_4_EXPOSURE_NS: u64 = 1_000_000_000 / 4;

/// Zoom factor above which Avg alignment searches one extra pyramid level.
pub const AVG_ZOOM_EXTRA_LEVEL: f32 = 2.0;

/// Metadata assumed for frames captured without ISO or exposure time.
pub const DEFAULT_ISO: u32 = 100;
pub const DEFAULT_EXPOSURE_NS: u64 = 1_000_000_000 / 30;
