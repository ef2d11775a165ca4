//! Vision primitives used by chart and black-level detection.
//!
//! The detectors only talk to [`ImageOps`]; [`CpuImageOps`] implements it
//! on top of `imageproc`.

mod components;
mod contours;
mod filter;
mod morphology;

pub use components::{label_components, ComponentStats, Components};
pub use filter::auto_sigma;
pub use morphology::{ElementShape, StructuringElement};

use crate::contour::{self, Contour, Moments};
use crate::GrayImage;
use ::image::{ImageBuffer, Luma};
use nalgebra::Point2;

/// Copy into an `image` buffer for the `imageproc` routines.
pub(crate) fn to_luma(src: &GrayImage) -> ::image::GrayImage {
    ImageBuffer::from_fn(src.width as u32, src.height as u32, |x, y| {
        Luma([src.get(x as usize, y as usize)])
    })
}

pub(crate) fn from_luma(buf: ::image::GrayImage) -> GrayImage {
    GrayImage {
        width: buf.width() as usize,
        height: buf.height() as usize,
        data: buf.into_raw(),
    }
}

/// Image-processing capability consumed by the detectors.
pub trait ImageOps {
    /// Multiply every sample by `factor`, rounding and saturating to `[0, 255]`.
    fn scale(&self, src: &GrayImage, factor: f32) -> GrayImage;

    /// `ksize x ksize` Gaussian with automatic sigma and clamp-to-edge borders.
    fn gaussian_blur(&self, src: &GrayImage, ksize: usize) -> GrayImage;

    /// 255 where `src <= round(box_mean) - c` over a `block x block` window.
    fn adaptive_threshold_mean_inv(&self, src: &GrayImage, block: usize, c: i32) -> GrayImage;

    fn dilate(&self, src: &GrayImage, se: StructuringElement) -> GrayImage;

    fn erode(&self, src: &GrayImage, se: StructuringElement) -> GrayImage;

    /// Morphological closing (dilate, then erode).
    fn close(&self, src: &GrayImage, se: StructuringElement) -> GrayImage {
        self.erode(&self.dilate(src, se), se)
    }

    /// 8-connected labeling of nonzero pixels.
    fn connected_components(&self, src: &GrayImage) -> Components;

    /// Outer borders of foreground components, then borders of enclosed holes.
    fn find_contours(&self, src: &GrayImage) -> Vec<Contour>;

    fn approx_polygon(&self, contour: &[Point2<i32>], epsilon: f64) -> Contour {
        contour::approx_polygon(contour, epsilon)
    }

    fn moments(&self, contour: &[Point2<i32>]) -> Moments {
        contour::moments(contour)
    }

    fn fill_polygon(&self, out: &mut GrayImage, polygon: &[Point2<i32>], value: u8) {
        contour::fill_polygon(out, polygon, value)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CpuImageOps;

impl ImageOps for CpuImageOps {
    fn scale(&self, src: &GrayImage, factor: f32) -> GrayImage {
        filter::scale(src, factor)
    }

    fn gaussian_blur(&self, src: &GrayImage, ksize: usize) -> GrayImage {
        filter::gaussian_blur(src, ksize)
    }

    fn adaptive_threshold_mean_inv(&self, src: &GrayImage, block: usize, c: i32) -> GrayImage {
        filter::adaptive_threshold_mean_inv(src, block, c)
    }

    fn dilate(&self, src: &GrayImage, se: StructuringElement) -> GrayImage {
        morphology::dilate(src, se)
    }

    fn erode(&self, src: &GrayImage, se: StructuringElement) -> GrayImage {
        morphology::erode(src, se)
    }

    fn connected_components(&self, src: &GrayImage) -> Components {
        label_components(src)
    }

    fn find_contours(&self, src: &GrayImage) -> Vec<Contour> {
        contours::find_contours(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::arc_length;

    fn grid_drawing() -> GrayImage {
        let mut img = GrayImage::filled(120, 90, 220);
        for y in 15..77 {
            for x in 15..107 {
                let on_column = [15, 45, 75, 105].iter().any(|&c| x == c || x == c + 1);
                let on_row = [15, 45, 75].iter().any(|&r| y == r || y == r + 1);
                if on_column || on_row {
                    img.set(x, y, 30);
                }
            }
        }
        img
    }

    #[test]
    fn grid_lines_become_one_region_with_a_hole_per_cell() {
        let ops = CpuImageOps;
        let bw = ops.adaptive_threshold_mean_inv(&grid_drawing(), 19, 2);
        let bw = ops.close(&bw, StructuringElement::new(ElementShape::Cross, 1));
        let comps = ops.connected_components(&bw);
        assert_eq!(comps.len(), 1);
        let s = comps.stats[0];
        assert_eq!((s.left, s.top, s.width, s.height), (15, 15, 92, 62));

        let contours = ops.find_contours(&comps.mask(s.label));
        assert_eq!(contours.len(), 7);
        for c in &contours {
            let quad = ops.approx_polygon(c, 0.08 * arc_length(c));
            assert_eq!(quad.len(), 4);
            assert!(ops.moments(&quad).m00 > 600.0);
        }
    }

    #[test]
    fn fill_then_label_round_trips_a_polygon() {
        let ops = CpuImageOps;
        let mut img = GrayImage::new(40, 40);
        let tri = vec![Point2::new(5, 5), Point2::new(30, 5), Point2::new(5, 30)];
        ops.fill_polygon(&mut img, &tri, 255);
        let comps = ops.connected_components(&img);
        assert_eq!(comps.len(), 1);
        assert_eq!((comps.stats[0].left, comps.stats[0].top), (5, 5));
        assert_eq!((comps.stats[0].width, comps.stats[0].height), (26, 26));
    }
}
