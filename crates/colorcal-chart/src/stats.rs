//! Per-patch color medians.

use crate::{ChartError, ColorPatch};
use colorcal_core::{ChannelAssignment, FloatImage, Mask, RgbImage};
use nalgebra::Vector3;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Image a statistics pass reads from.
#[derive(Clone, Copy)]
pub enum MeasureImage<'a> {
    /// Normalized mosaic; each site contributes to the channel it samples.
    Raw {
        image: &'a FloatImage,
        layout: &'a dyn ChannelAssignment,
    },
    /// Demosaiced image; each pixel contributes to all three channels.
    Rgb(&'a RgbImage),
}

/// Element at rank `len / 2`, the upper of the two middles for even counts.
/// Reorders `values`.
pub fn select_median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*m)
}

fn medians(mut samples: [Vec<f32>; 3]) -> Option<Vector3<f32>> {
    let r = select_median(&mut samples[0])?;
    let g = select_median(&mut samples[1])?;
    let b = select_median(&mut samples[2])?;
    Some(Vector3::new(r, g, b))
}

/// Median of the raw samples under `mask`, split by channel.
/// `None` when some channel has no sample.
pub fn raw_median(
    image: &FloatImage,
    layout: &dyn ChannelAssignment,
    mask: &Mask,
) -> Option<Vector3<f32>> {
    let mut samples: [Vec<f32>; 3] = Default::default();
    for (x, y) in mask.iter_set() {
        let ch = layout.channel_at(y, x);
        samples[ch.index()].push(image.get(x, y));
    }
    medians(samples)
}

/// Per-channel median of the RGB pixels under `mask`.
pub fn rgb_median(image: &RgbImage, mask: &Mask) -> Option<Vector3<f32>> {
    let mut samples: [Vec<f32>; 3] = Default::default();
    for (x, y) in mask.iter_set() {
        let px = image.get(x, y);
        for (ch, v) in samples.iter_mut().zip(px) {
            ch.push(v);
        }
    }
    medians(samples)
}

pub fn mask_median(source: MeasureImage<'_>, mask: &Mask) -> Option<Vector3<f32>> {
    match source {
        MeasureImage::Raw { image, layout } => raw_median(image, layout, mask),
        MeasureImage::Rgb(image) => rgb_median(image, mask),
    }
}

/// Recompute `rgb_median` of every patch from `source`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(patches, source), fields(patches = patches.len()))
)]
pub fn measure_patches(
    patches: &mut [ColorPatch],
    source: MeasureImage<'_>,
) -> Result<(), ChartError> {
    for (index, patch) in patches.iter_mut().enumerate() {
        let median = mask_median(source, &patch.mask).ok_or(ChartError::EmptyPatch { index })?;
        log::debug!(
            "patch {index} median [{:.4}, {:.4}, {:.4}]",
            median.x,
            median.y,
            median.z
        );
        patch.rgb_median = Some(median);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorcal_core::{BayerPattern, PixelRect};
    use nalgebra::Point2;

    fn rect_mask(w: usize, h: usize) -> Mask {
        Mask::from_rect(
            w,
            h,
            PixelRect {
                x: 2,
                y: 2,
                width: 4,
                height: 4,
            },
        )
    }

    #[test]
    fn even_counts_take_upper_middle() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(select_median(&mut v), Some(3.0));
        let mut pair = vec![10.0, 20.0];
        assert_eq!(select_median(&mut pair), Some(20.0));
        assert_eq!(select_median(&mut []), None);
    }

    #[test]
    fn odd_counts_take_the_middle() {
        let mut v = vec![9.0, -1.0, 5.0, 7.0, 0.5];
        assert_eq!(select_median(&mut v), Some(5.0));
    }

    #[test]
    fn uniform_raw_patch_reports_its_values() {
        let layout = BayerPattern::Rggb;
        let mut img = FloatImage::filled(10, 10, 0.0);
        for y in 0..10 {
            for x in 0..10 {
                let v = [0.2, 0.5, 0.7][layout.channel_at(y, x).index()];
                img.set(x, y, v);
            }
        }
        let mut patches = vec![ColorPatch::new(rect_mask(10, 10), Point2::new(4.0, 4.0))];
        measure_patches(
            &mut patches,
            MeasureImage::Raw {
                image: &img,
                layout: &layout,
            },
        )
        .unwrap();
        assert_eq!(patches[0].rgb_median, Some(Vector3::new(0.2, 0.5, 0.7)));
    }

    #[test]
    fn uniform_rgb_patch_reports_its_values() {
        let img = RgbImage::filled(10, 10, [0.1, 0.4, 0.9]);
        let mut patches = vec![ColorPatch::new(rect_mask(10, 10), Point2::new(4.0, 4.0))];
        measure_patches(&mut patches, MeasureImage::Rgb(&img)).unwrap();
        assert_eq!(patches[0].median(0).unwrap(), Vector3::new(0.1, 0.4, 0.9));
    }

    #[test]
    fn empty_mask_is_an_error() {
        let img = RgbImage::filled(10, 10, [0.0; 3]);
        let mut patches = vec![
            ColorPatch::new(rect_mask(10, 10), Point2::new(0.0, 0.0)),
            ColorPatch::new(Mask::empty(10, 10), Point2::new(0.0, 0.0)),
        ];
        let err = measure_patches(&mut patches, MeasureImage::Rgb(&img)).unwrap_err();
        assert!(matches!(err, ChartError::EmptyPatch { index: 1 }));
        assert!(patches[0].rgb_median.is_some());
    }

    #[test]
    fn unmeasured_patch_is_reported() {
        let patch = ColorPatch::new(Mask::empty(4, 4), Point2::new(0.0, 0.0));
        assert!(matches!(
            patch.median(7),
            Err(ChartError::UnmeasuredPatch { index: 7 })
        ));
    }
}
