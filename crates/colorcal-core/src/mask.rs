use crate::GrayImage;
use serde::{Deserialize, Serialize};

/// Inclusive-exclusive pixel rectangle: `x..x + width`, `y..y + height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Binary mask over an image of size `image_width x image_height`.
///
/// Only the bounding rectangle of the set pixels is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    image_width: usize,
    image_height: usize,
    roi: PixelRect,
    bits: Vec<bool>,
}

impl Mask {
    /// Mask with every pixel of `rect` set. The rectangle is clipped to the image.
    pub fn from_rect(image_width: usize, image_height: usize, rect: PixelRect) -> Self {
        let x1 = (rect.x + rect.width).min(image_width);
        let y1 = (rect.y + rect.height).min(image_height);
        let roi = PixelRect {
            x: rect.x.min(x1),
            y: rect.y.min(y1),
            width: x1.saturating_sub(rect.x),
            height: y1.saturating_sub(rect.y),
        };
        Self {
            image_width,
            image_height,
            roi,
            bits: vec![true; roi.area()],
        }
    }

    /// Nonzero pixels of `gray` become set pixels.
    pub fn from_gray(gray: &GrayImage) -> Self {
        let mut x0 = usize::MAX;
        let mut y0 = usize::MAX;
        let mut x1 = 0;
        let mut y1 = 0;
        for y in 0..gray.height {
            for x in 0..gray.width {
                if gray.get(x, y) != 0 {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x + 1);
                    y1 = y1.max(y + 1);
                }
            }
        }
        if x0 == usize::MAX {
            return Self::empty(gray.width, gray.height);
        }
        let roi = PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        };
        let mut bits = Vec::with_capacity(roi.area());
        for y in y0..y1 {
            for x in x0..x1 {
                bits.push(gray.get(x, y) != 0);
            }
        }
        Self {
            image_width: gray.width,
            image_height: gray.height,
            roi,
            bits,
        }
    }

    pub fn empty(image_width: usize, image_height: usize) -> Self {
        Self {
            image_width,
            image_height,
            roi: PixelRect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            },
            bits: Vec::new(),
        }
    }

    /// Bounding rectangle of the stored region.
    pub fn roi(&self) -> PixelRect {
        self.roi
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.roi.contains(x, y) && self.bits[(y - self.roi.y) * self.roi.width + (x - self.roi.x)]
    }

    /// Set pixel locations `(x, y)` in raster order.
    pub fn iter_set(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let roi = self.roi;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(move |(i, _)| (roi.x + i % roi.width, roi.y + i / roi.width))
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Expand back into a full-size 0/255 image.
    pub fn to_gray(&self) -> GrayImage {
        let mut out = GrayImage::new(self.image_width, self.image_height);
        for (x, y) in self.iter_set() {
            out.set(x, y, 255);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_mask_is_clipped() {
        let m = Mask::from_rect(
            10,
            10,
            PixelRect {
                x: 8,
                y: 7,
                width: 5,
                height: 5,
            },
        );
        assert_eq!(m.count(), 2 * 3);
        assert!(m.contains(9, 9));
        assert!(!m.contains(7, 9));
    }

    #[test]
    fn gray_round_trip_keeps_pixels() {
        let mut g = GrayImage::new(6, 5);
        g.set(1, 1, 255);
        g.set(4, 3, 1);
        let m = Mask::from_gray(&g);
        assert_eq!(m.roi().width, 4);
        assert_eq!(m.roi().height, 3);
        assert_eq!(m.iter_set().collect::<Vec<_>>(), vec![(1, 1), (4, 3)]);
        assert_eq!(m.to_gray().data.iter().filter(|&&v| v == 255).count(), 2);
    }

    #[test]
    fn empty_gray_gives_empty_mask() {
        let m = Mask::from_gray(&GrayImage::new(3, 3));
        assert!(m.is_empty());
        assert_eq!(m.iter_set().count(), 0);
    }
}
