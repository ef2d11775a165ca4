//! Color error of a corrected image against the reference chart.

use crate::CalibError;
use colorcal_chart::{rgb_median, ChartError, ColorPatch, ReferenceChart};
use colorcal_core::RgbImage;
use serde::{Deserialize, Serialize};

/// Mean error over patches on the 0-255 scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorErrors {
    /// Mean Euclidean distance in RGB.
    pub euclidean: f32,
    /// Mean absolute difference per channel.
    pub per_channel: [f32; 3],
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    /// Errors of `image` measured under each patch mask.
    pub fn measure(
        image: &RgbImage,
        patches: &[ColorPatch],
        chart: &ReferenceChart,
    ) -> Result<ColorErrors, CalibError> {
        if patches.len() != chart.len() {
            return Err(CalibError::CountMismatch {
                patches: patches.len(),
                reference: chart.len(),
            });
        }
        if patches.is_empty() {
            return Ok(ColorErrors::default());
        }
        let mut errors = ColorErrors::default();
        for (index, (patch, reference)) in patches.iter().zip(chart.normalized()).enumerate() {
            let median =
                rgb_median(image, &patch.mask).ok_or(ChartError::EmptyPatch { index })?;
            let diff = (median - reference) * 255.0;
            errors.euclidean += diff.norm();
            for (acc, d) in errors.per_channel.iter_mut().zip(diff.iter()) {
                *acc += d.abs();
            }
        }
        let n = patches.len() as f32;
        errors.euclidean /= n;
        errors.per_channel.iter_mut().for_each(|v| *v /= n);
        Ok(errors)
    }

    /// `(before, after)` errors for the image before and after correction.
    pub fn report(
        before: &RgbImage,
        after: &RgbImage,
        patches: &[ColorPatch],
        chart: &ReferenceChart,
    ) -> Result<(ColorErrors, ColorErrors), CalibError> {
        let errors_before = Self::measure(before, patches, chart)?;
        let errors_after = Self::measure(after, patches, chart)?;
        log::info!(
            "color error before {:.3} [{:.3}, {:.3}, {:.3}]",
            errors_before.euclidean,
            errors_before.per_channel[0],
            errors_before.per_channel[1],
            errors_before.per_channel[2]
        );
        log::info!(
            "color error after {:.3} [{:.3}, {:.3}, {:.3}]",
            errors_after.euclidean,
            errors_after.per_channel[0],
            errors_after.per_channel[1],
            errors_after.per_channel[2]
        );
        Ok((errors_before, errors_after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use colorcal_core::{Mask, PixelRect};
    use nalgebra::Point2;

    /// One 4x4 cell per reference color, laid out as a 6x4 grid.
    fn chart_image(chart: &ReferenceChart, shift: [f32; 3]) -> (RgbImage, Vec<ColorPatch>) {
        let mut img = RgbImage::filled(24, 16, [0.0; 3]);
        let mut patches = Vec::new();
        for (i, c) in chart.normalized().iter().enumerate() {
            let rect = PixelRect {
                x: (i % 6) * 4,
                y: (i / 6) * 4,
                width: 4,
                height: 4,
            };
            for y in rect.y..rect.y + 4 {
                for x in rect.x..rect.x + 4 {
                    img.set(x, y, [c.x + shift[0], c.y + shift[1], c.z + shift[2]]);
                }
            }
            patches.push(ColorPatch::new(
                Mask::from_rect(24, 16, rect),
                Point2::new(rect.x as f32 + 1.5, rect.y as f32 + 1.5),
            ));
        }
        (img, patches)
    }

    #[test]
    fn exact_colors_have_no_error() {
        let chart = ReferenceChart::macbeth();
        let (img, patches) = chart_image(&chart, [0.0; 3]);
        let errors = ErrorReporter::measure(&img, &patches, &chart).unwrap();
        assert_relative_eq!(errors.euclidean, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn uniform_shift_is_reported_per_channel() {
        let chart = ReferenceChart::macbeth();
        let (exact, patches) = chart_image(&chart, [0.0; 3]);
        let (shifted, _) = chart_image(&chart, [3.0 / 255.0, 0.0, 4.0 / 255.0]);
        let (before, after) = ErrorReporter::report(&shifted, &exact, &patches, &chart).unwrap();
        assert_relative_eq!(before.euclidean, 5.0, epsilon = 1e-3);
        assert_relative_eq!(before.per_channel[0], 3.0, epsilon = 1e-3);
        assert_relative_eq!(before.per_channel[1], 0.0, epsilon = 1e-3);
        assert_relative_eq!(before.per_channel[2], 4.0, epsilon = 1e-3);
        assert!(after.euclidean < 1e-3);
    }
}
