//! Per-channel affine sensor response fitted on the chart's gray series.

use crate::CalibError;
use colorcal_chart::{ColorPatch, ReferenceChart};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Neutral patches used as anchors, counted from the dark end. The darkest
/// and brightest grays are skipped as the most likely to clip.
const DARK_ANCHOR: usize = 1;
const BRIGHT_ANCHOR: usize = 4;

/// `y = slope * x + intercept_y` per channel, with `x` the normalized
/// reference gray and `y` the measured median.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorResponse {
    pub slope: Vector3<f32>,
    pub intercept_y: Vector3<f32>,
    /// `x` where the response crosses 0.
    pub intercept_x_min: Vector3<f32>,
    /// `x` where the response crosses 1.
    pub intercept_x_max: Vector3<f32>,
}

impl ColorResponse {
    /// Line through two anchors per channel. `x_dark != x_bright`.
    pub fn from_anchors(
        x_dark: f32,
        y_dark: Vector3<f32>,
        x_bright: f32,
        y_bright: Vector3<f32>,
    ) -> Self {
        let slope = (y_bright - y_dark) / (x_bright - x_dark);
        let intercept_y = y_dark - slope * x_dark;
        let intercept_x_min = (-intercept_y).component_div(&slope);
        let intercept_x_max = intercept_y.map(|b| 1.0 - b).component_div(&slope);
        Self {
            slope,
            intercept_y,
            intercept_x_min,
            intercept_x_max,
        }
    }

    /// Fit on ordered, measured patches. Patch `i` must show reference color `i`.
    pub fn fit(patches: &[ColorPatch], chart: &ReferenceChart) -> Result<Self, CalibError> {
        if patches.len() != chart.len() {
            return Err(CalibError::CountMismatch {
                patches: patches.len(),
                reference: chart.len(),
            });
        }
        let neutral = chart.neutral_series();
        if neutral.len() <= BRIGHT_ANCHOR {
            return Err(CalibError::InvalidConfig(format!(
                "reference chart '{}' has no usable neutral series",
                chart.name
            )));
        }
        let n = patches.len();
        let dark_index = n - 1 - DARK_ANCHOR;
        let bright_index = n - 1 - BRIGHT_ANCHOR;
        let y_dark = patches[dark_index].median(dark_index)?;
        let y_bright = patches[bright_index].median(bright_index)?;
        let x_dark = neutral[DARK_ANCHOR] as f32 / 255.0;
        let x_bright = neutral[BRIGHT_ANCHOR] as f32 / 255.0;

        let response = Self::from_anchors(x_dark, y_dark, x_bright, y_bright);
        if response.slope.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            log::warn!("non-increasing response: slope {:?}", response.slope);
        }
        log::info!(
            "response slope [{:.4}, {:.4}, {:.4}] intercept [{:.4}, {:.4}, {:.4}]",
            response.slope.x,
            response.slope.y,
            response.slope.z,
            response.intercept_y.x,
            response.intercept_y.y,
            response.intercept_y.z
        );
        Ok(response)
    }

    /// `intercept_y` in sensor levels of a capture whose samples top out at
    /// `max_value`.
    pub fn intercept_levels(&self, max_value: u32) -> Vector3<f32> {
        self.intercept_y * max_value as f32
    }

    /// Gains that bring every channel to unit slope.
    pub fn white_balance_gains(&self) -> Vector3<f32> {
        self.slope.map(|s| 1.0 / s)
    }

    pub fn value_at(&self, x: f32) -> Vector3<f32> {
        self.slope * x + self.intercept_y
    }

    /// Input range every channel can represent: the largest zero crossing
    /// and the smallest one crossing, both clipped to `[0, 1]`.
    pub fn clamp_range(&self) -> (f32, f32) {
        let x_min = self.intercept_x_min.max().clamp(0.0, 1.0);
        let x_max = self.intercept_x_max.min().clamp(0.0, 1.0);
        (x_min, x_max)
    }

    /// Per-channel output bounds at `x_min` and `x_max`, clipped to `[0, 1]`.
    pub fn clamp_bounds(&self, x_min: f32, x_max: f32) -> (Vector3<f32>, Vector3<f32>) {
        let lo = self.value_at(x_min).map(|v| v.clamp(0.0, 1.0));
        let hi = self.value_at(x_max).map(|v| v.clamp(0.0, 1.0));
        (lo, hi)
    }
}
