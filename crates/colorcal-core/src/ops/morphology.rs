use super::{from_luma, to_luma};
use crate::GrayImage;
use ::image::Luma;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementShape {
    /// `+`-shaped: the center row and column.
    Cross,
    /// Full `(2r + 1) x (2r + 1)` square.
    Rect,
}

// Largest radius whose center still fits the mask's u8 anchor.
const MAX_RADIUS: usize = u8::MAX as usize;

/// Square-support structuring element anchored at its center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructuringElement {
    pub shape: ElementShape,
    pub radius: usize,
}

impl StructuringElement {
    pub fn new(shape: ElementShape, radius: usize) -> Self {
        Self { shape, radius }
    }

    /// Radius `floor(fraction * min(width, height))`.
    pub fn for_image(shape: ElementShape, width: usize, height: usize, fraction: f32) -> Self {
        let radius = (fraction * width.min(height) as f32).floor().max(0.0) as usize;
        Self { shape, radius }
    }

    /// `imageproc` mask of this element, centered at `(radius, radius)`.
    fn to_mask(self) -> Mask {
        let r = self.radius.min(MAX_RADIUS) as u32;
        let side = 2 * r + 1;
        let support = ::image::GrayImage::from_fn(side, side, |x, y| {
            let inside = match self.shape {
                ElementShape::Rect => true,
                ElementShape::Cross => x == r || y == r,
            };
            Luma([if inside { 255 } else { 0 }])
        });
        Mask::from_image(&support, r as u8, r as u8)
    }
}

/// Samples outside the image do not participate.
pub(crate) fn dilate(src: &GrayImage, se: StructuringElement) -> GrayImage {
    from_luma(grayscale_dilate(&to_luma(src), &se.to_mask()))
}

pub(crate) fn erode(src: &GrayImage, se: StructuringElement) -> GrayImage {
    from_luma(grayscale_erode(&to_luma(src), &se.to_mask()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot() -> GrayImage {
        let mut img = GrayImage::new(7, 7);
        img.set(3, 3, 255);
        img
    }

    #[test]
    fn radius_follows_shorter_side() {
        let se = StructuringElement::for_image(ElementShape::Cross, 800, 600, 0.003);
        assert_eq!(se.radius, 1);
        let se = StructuringElement::for_image(ElementShape::Rect, 4000, 3000, 0.003);
        assert_eq!(se.radius, 9);
    }

    #[test]
    fn cross_and_rect_dilation_shapes() {
        let cross = dilate(&dot(), StructuringElement::new(ElementShape::Cross, 1));
        assert_eq!(cross.data.iter().filter(|&&v| v == 255).count(), 5);
        assert_eq!(cross.get(2, 2), 0);

        let rect = dilate(&dot(), StructuringElement::new(ElementShape::Rect, 1));
        assert_eq!(rect.data.iter().filter(|&&v| v == 255).count(), 9);
        assert_eq!(rect.get(2, 2), 255);
    }

    #[test]
    fn closing_bridges_one_pixel_gap() {
        let mut img = GrayImage::new(9, 5);
        for x in 0..9 {
            if x != 4 {
                img.set(x, 2, 255);
            }
        }
        let se = StructuringElement::new(ElementShape::Rect, 1);
        let closed = erode(&dilate(&img, se), se);
        assert_eq!(closed.get(4, 2), 255);
        assert_eq!(closed.get(4, 1), 0);
    }

    #[test]
    fn erosion_ignores_outside_samples() {
        let img = GrayImage::filled(4, 4, 255);
        let eroded = erode(&img, StructuringElement::new(ElementShape::Rect, 1));
        assert!(eroded.data.iter().all(|&v| v == 255));
    }
}
