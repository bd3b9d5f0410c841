use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_COARSE_RADIUS, DEFAULT_CONTRAST_ALPHA, DEFAULT_CONTRAST_TILES,
    DEFAULT_LUMINANCE_MAX_ERROR, DEFAULT_MTB_BAND, DEFAULT_MTB_MAX_ERROR,
    DEFAULT_PYRAMID_LEVELS, DEFAULT_REFINE_RADIUS,
};

/// Top-level configuration consumed by the merge pipelines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub contrast_enhancement: ContrastEnhancement,
    /// Alpha used by `ContrastEnhancement::Always` and single-frame DRO.
    #[serde(default = "default_alpha")]
    pub always_alpha: f32,
    #[serde(default)]
    pub tonemap_algorithm: TonemapAlgorithm,
    #[serde(default)]
    pub dro_algorithm: DroAlgorithm,
    #[serde(default)]
    pub hdr: HdrConfig,
    #[serde(default)]
    pub avg: AvgConfig,
}

fn default_alpha() -> f32 {
    DEFAULT_CONTRAST_ALPHA
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            contrast_enhancement: ContrastEnhancement::default(),
            always_alpha: DEFAULT_CONTRAST_ALPHA,
            tonemap_algorithm: TonemapAlgorithm::default(),
            dro_algorithm: DroAlgorithm::default(),
            hdr: HdrConfig::default(),
            avg: AvgConfig::default(),
        }
    }
}

/// Error metric used by the alignment search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignMetric {
    /// Mean absolute luminance difference over the overlap.
    #[default]
    Luminance,
    /// Mean difference of median threshold bitmaps, each ramping from 0 to
    /// 1 across a band around its frame's median. Insensitive to exposure
    /// differences without needing to know them.
    MedianThreshold,
}

impl std::fmt::Display for AlignMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Luminance => write!(f, "Luminance"),
            Self::MedianThreshold => write!(f, "Median Threshold"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub metric: AlignMetric,
    /// Pyramid levels below full resolution. Reduced automatically for
    /// small frames.
    pub levels: usize,
    /// Search radius at the coarsest level.
    pub coarse_radius: i32,
    /// Refinement radius at each finer level.
    pub refine_radius: i32,
    /// Luminance differences at or below this are treated as noise.
    pub noise_threshold: f32,
    /// Half-width of the MTB ramp around the median, for a mid-grey median.
    pub mtb_band: f32,
    /// Error ceiling; above it the offset falls back to (0, 0).
    /// `None` uses the metric's default.
    pub max_error: Option<f32>,
}

impl AlignConfig {
    pub fn with_metric(metric: AlignMetric) -> Self {
        Self {
            metric,
            ..Default::default()
        }
    }

    pub fn error_ceiling(&self) -> f32 {
        self.max_error.unwrap_or(match self.metric {
            AlignMetric::Luminance => DEFAULT_LUMINANCE_MAX_ERROR,
            AlignMetric::MedianThreshold => DEFAULT_MTB_MAX_ERROR,
        })
    }
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            metric: AlignMetric::Luminance,
            levels: DEFAULT_PYRAMID_LEVELS,
            coarse_radius: DEFAULT_COARSE_RADIUS,
            refine_radius: DEFAULT_REFINE_RADIUS,
            noise_threshold: 0.0,
            mtb_band: DEFAULT_MTB_BAND,
            max_error: None,
        }
    }
}

/// Motion threshold parameters for ghost detection (8-bit units).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    /// Difference tolerated in perfectly flat regions.
    pub base_threshold: f32,
    /// Extra tolerance per unit of local contrast (3x3 max - min).
    pub contrast_factor: f32,
    /// Samples below this are too dark to judge.
    pub clip_low: f32,
    /// Samples above this are too bright to judge.
    pub clip_high: f32,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            base_threshold: 24.0,
            contrast_factor: 0.5,
            clip_low: 8.0,
            clip_high: 247.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HdrConfig {
    pub alignment: AlignConfig,
    pub ghost: GhostConfig,
    pub contrast_tiles: usize,
}

impl Default for HdrConfig {
    fn default() -> Self {
        Self {
            alignment: AlignConfig::default(),
            ghost: GhostConfig::default(),
            contrast_tiles: DEFAULT_CONTRAST_TILES,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AvgConfig {
    pub alignment: AlignConfig,
    /// Overrides the ISO-derived temporal Wiener constant.
    pub wiener_c: Option<f32>,
    /// Run the spatial denoise filter on noisy captures when finishing.
    pub spatial_denoise: bool,
}

impl Default for AvgConfig {
    fn default() -> Self {
        Self {
            alignment: AlignConfig::default(),
            wiener_c: None,
            spatial_denoise: true,
        }
    }
}

/// When to apply local contrast enhancement after HDR fusion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContrastEnhancement {
    Off,
    /// Only for short exposures, where the bracket spans a wide range.
    #[default]
    Smart,
    Always,
}

impl std::fmt::Display for ContrastEnhancement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Smart => write!(f, "Smart"),
            Self::Always => write!(f, "Always"),
        }
    }
}

/// Global operator compressing the fused range to 8 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TonemapAlgorithm {
    Clamp,
    Exponential,
    #[default]
    Reinhard,
    /// Uncharted 2 filmic curve.
    Filmic,
    Aces,
}

impl std::fmt::Display for TonemapAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clamp => write!(f, "Clamp"),
            Self::Exponential => write!(f, "Exponential"),
            Self::Reinhard => write!(f, "Reinhard"),
            Self::Filmic => write!(f, "Filmic"),
            Self::Aces => write!(f, "ACES"),
        }
    }
}

/// Single-frame dynamic range optimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroAlgorithm {
    None,
    #[default]
    GainGamma,
}

impl std::fmt::Display for DroAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::GainGamma => write!(f, "Gain/Gamma"),
        }
    }
}
