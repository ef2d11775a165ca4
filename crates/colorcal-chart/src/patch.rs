use crate::ChartError;
use colorcal_core::{Mask, PixelRect};
use nalgebra::{Point2, Vector3};

/// One detected chart square.
#[derive(Clone, Debug)]
pub struct ColorPatch {
    pub mask: Mask,
    pub centroid: Point2<f32>,
    /// Per-channel median from the last statistics pass.
    pub rgb_median: Option<Vector3<f32>>,
}

impl ColorPatch {
    pub fn new(mask: Mask, centroid: Point2<f32>) -> Self {
        Self {
            mask,
            centroid,
            rgb_median: None,
        }
    }

    pub fn bounds(&self) -> PixelRect {
        self.mask.roi()
    }

    /// Median of patch `index`, or `UnmeasuredPatch` before any statistics pass.
    pub fn median(&self, index: usize) -> Result<Vector3<f32>, ChartError> {
        self.rgb_median
            .ok_or(ChartError::UnmeasuredPatch { index })
    }
}

/// Medians of an ordered patch list.
pub fn patch_medians(patches: &[ColorPatch]) -> Result<Vec<Vector3<f32>>, ChartError> {
    patches
        .iter()
        .enumerate()
        .map(|(i, p)| p.median(i))
        .collect()
}
