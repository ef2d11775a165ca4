use serde::{Deserialize, Serialize};

/// Tolerances of the chart / patch detector.
///
/// Area limits are fractions of the full image area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartDetectorParams {
    /// Gain applied before blurring so patches stand out from their borders.
    pub brighten: f32,
    /// Gaussian kernel size (odd).
    pub blur_ksize: usize,
    pub adaptive_block: usize,
    pub adaptive_c: i32,
    /// Structuring-element radius as a fraction of the shorter image side.
    pub morph_fraction: f32,
    /// Components smaller than this are treated as noise.
    pub noise_area: f32,
    pub chart_min_area: f32,
    pub chart_max_area: f32,
    /// Allowed horizontal offset of the chart from the image center,
    /// relative to half the image width.
    pub center_tolerance: f32,
    /// Polygon simplification tolerance relative to the contour perimeter.
    pub simplify: f64,
    pub patch_min_area: f32,
    pub patch_max_area: f32,
    /// Long over short side of the minimum-area rectangle.
    pub max_aspect: f32,
    /// Patches whose nearest neighbour is farther than this multiple of the
    /// median nearest-neighbour distance are dropped.
    pub outlier_factor: f32,
}

impl Default for ChartDetectorParams {
    fn default() -> Self {
        Self {
            brighten: 2.0,
            blur_ksize: 15,
            adaptive_block: 19,
            adaptive_c: 2,
            morph_fraction: 0.003,
            noise_area: 1e-4,
            chart_min_area: 0.01,
            chart_max_area: 0.40,
            center_tolerance: 0.10,
            simplify: 0.08,
            patch_min_area: 1e-4,
            patch_max_area: 4.5e-3,
            max_aspect: 1.2,
            outlier_factor: 2.0,
        }
    }
}

/// Tolerances of the black-region search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackLevelParams {
    /// Histogram noise floor and minimum region area, in pixels.
    pub min_pixel_count: usize,
    pub simplify: f64,
    pub min_vertices: usize,
    /// Contour area over enclosing-circle area.
    pub min_circularity: f32,
    /// Consecutive histogram bins above the noise floor needed before a
    /// threshold is accepted. `1` takes the first qualifying bin.
    pub min_run_bins: usize,
}

impl Default for BlackLevelParams {
    fn default() -> Self {
        Self {
            min_pixel_count: 50,
            simplify: 0.01,
            min_vertices: 10,
            min_circularity: 0.5,
            min_run_bins: 1,
        }
    }
}
