use super::to_luma;
use crate::GrayImage;
use ::image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

/// Per-label statistics of a connected component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentStats {
    pub label: u32,
    pub area: usize,
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl ComponentStats {
    pub fn bbox_area(&self) -> usize {
        self.width * self.height
    }

    pub fn touches_border(&self, image_width: usize, image_height: usize) -> bool {
        self.left == 0
            || self.top == 0
            || self.left + self.width == image_width
            || self.top + self.height == image_height
    }
}

/// Label image (0 = background) and stats for labels `1..=stats.len()`,
/// numbered in raster order of each component's first pixel.
#[derive(Clone, Debug)]
pub struct Components {
    pub width: usize,
    pub height: usize,
    pub labels: Vec<u32>,
    pub stats: Vec<ComponentStats>,
}

impl Components {
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    #[inline]
    pub fn label_at(&self, x: usize, y: usize) -> u32 {
        self.labels[y * self.width + x]
    }

    /// 0/255 image of the pixels carrying `label`.
    pub fn mask(&self, label: u32) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .labels
                .iter()
                .map(|&l| if l == label { 255 } else { 0 })
                .collect(),
        }
    }
}

/// 8-connected labeling of the nonzero pixels of `src`.
pub fn label_components(src: &GrayImage) -> Components {
    let (w, h) = (src.width, src.height);
    let labels = connected_components(&to_luma(src), Connectivity::Eight, Luma([0u8])).into_raw();

    // (area, x_min, y_min, x_max, y_max) per label.
    let mut acc: Vec<(usize, usize, usize, usize, usize)> = Vec::new();
    for (i, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        let (x, y) = (i % w, i / w);
        let idx = label as usize - 1;
        if idx >= acc.len() {
            acc.resize(idx + 1, (0, usize::MAX, usize::MAX, 0, 0));
        }
        let e = &mut acc[idx];
        e.0 += 1;
        e.1 = e.1.min(x);
        e.2 = e.2.min(y);
        e.3 = e.3.max(x);
        e.4 = e.4.max(y);
    }

    let stats = acc
        .into_iter()
        .enumerate()
        .filter(|(_, e)| e.0 > 0)
        .map(|(i, (area, x0, y0, x1, y1))| ComponentStats {
            label: i as u32 + 1,
            area,
            left: x0,
            top: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
        .collect();

    Components {
        width: w,
        height: h,
        labels,
        stats,
    }
}
