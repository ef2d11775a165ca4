//! Chart segmentation into per-patch masks.
//!
//! The chart is found as the large, roughly centered network of dark patch
//! borders. Patches are the square holes of that network.

use crate::debug::overlay_patches;
use crate::{ChartDetectorParams, ChartError, ColorPatch, DebugContext};
use colorcal_core::contour::{arc_length, bounding_box, is_convex, min_area_rect};
use colorcal_core::ops::{ComponentStats, ElementShape, StructuringElement};
use colorcal_core::{Contour, CpuImageOps, GrayImage, ImageOps, Mask, PixelRect};
use kiddo::{KdTree, SquaredEuclidean};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Finds chart patches in an 8-bit photograph.
pub struct ChartDetector<O = CpuImageOps> {
    ops: O,
    params: ChartDetectorParams,
}

impl ChartDetector<CpuImageOps> {
    pub fn new(params: ChartDetectorParams) -> Self {
        Self::with_ops(CpuImageOps, params)
    }
}

impl Default for ChartDetector<CpuImageOps> {
    fn default() -> Self {
        Self::new(ChartDetectorParams::default())
    }
}

impl<O: ImageOps> ChartDetector<O> {
    pub fn with_ops(ops: O, params: ChartDetectorParams) -> Self {
        Self { ops, params }
    }

    #[inline]
    pub fn params(&self) -> &ChartDetectorParams {
        &self.params
    }

    /// Segment `image` into patches of a `grid_width x grid_height` chart.
    ///
    /// Returns the patches in detection order with isolated outliers
    /// removed; use [`crate::order_patches`] for raster order. The result
    /// may be empty when a chart region is found but no contour passes
    /// the patch filters.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image, debug), fields(width = image.width, height = image.height))
    )]
    pub fn detect(
        &self,
        image: &GrayImage,
        grid_width: usize,
        grid_height: usize,
        debug: &mut DebugContext,
    ) -> Result<Vec<ColorPatch>, ChartError> {
        let borders = self.border_mask(image, debug)?;
        let contours = self.chart_contours(&borders, grid_width * grid_height)?;

        let mut patches = self.filter_patches(&contours, image.width, image.height);
        log::info!("{} patch candidates", patches.len());
        if patches.is_empty() {
            return Ok(patches);
        }
        patches = remove_outliers(patches, self.params.outlier_factor);
        log::info!("{} patches after outlier removal", patches.len());

        if debug.is_enabled() {
            let overlay = overlay_patches(image, &patches);
            debug.save_rgb8("detected_patches", image.width, image.height, &overlay)?;
        }
        Ok(patches)
    }

    /// Binary image of dilated patch borders.
    fn border_mask(
        &self,
        image: &GrayImage,
        debug: &mut DebugContext,
    ) -> Result<GrayImage, ChartError> {
        let p = &self.params;
        let scaled = self.ops.scale(image, p.brighten);
        let blurred = self.ops.gaussian_blur(&scaled, p.blur_ksize);
        debug.save_gray("scaled_blurred", &blurred)?;

        let bw = self
            .ops
            .adaptive_threshold_mean_inv(&blurred, p.adaptive_block, p.adaptive_c);
        debug.save_gray("adaptive_threshold", &bw)?;

        let cross = StructuringElement::for_image(
            ElementShape::Cross,
            image.width,
            image.height,
            p.morph_fraction,
        );
        let bw = self.ops.close(&bw, cross);
        debug.save_gray("fill_gaps", &bw)?;

        let bw = self.remove_small_objects(&bw);
        debug.save_gray("no_small_objects", &bw)?;

        let rect = StructuringElement::for_image(
            ElementShape::Rect,
            image.width,
            image.height,
            p.morph_fraction,
        );
        let bw = self.ops.dilate(&bw, rect);
        debug.save_gray("dilate", &bw)?;
        Ok(bw)
    }

    fn remove_small_objects(&self, bw: &GrayImage) -> GrayImage {
        let min_area = (self.params.noise_area * bw.area() as f32) as usize;
        let comps = self.ops.connected_components(bw);
        let small: Vec<bool> = std::iter::once(false)
            .chain(comps.stats.iter().map(|s| s.area < min_area))
            .collect();
        let mut out = bw.clone();
        for (v, &label) in out.data.iter_mut().zip(&comps.labels) {
            if small[label as usize] {
                *v = 0;
            }
        }
        out
    }

    fn is_chart_candidate(&self, s: &ComponentStats, width: usize, height: usize) -> bool {
        let p = &self.params;
        let image_area = (width * height) as f32;
        if (s.area as f32) < p.chart_min_area * image_area {
            return false;
        }
        let cx = (width / 2) as f32;
        let cy = height / 2;
        let left = s.left as f32;
        let right = (s.left + s.width) as f32;
        if left > (1.0 + p.center_tolerance) * cx
            || s.top > cy
            || right < (1.0 - p.center_tolerance) * cx
            || s.top + s.height < cy
        {
            return false;
        }
        s.bbox_area() as f32 <= p.chart_max_area * image_area
    }

    /// Simplified contours of the first admissible chart region.
    fn chart_contours(
        &self,
        borders: &GrayImage,
        min_contours: usize,
    ) -> Result<Vec<Contour>, ChartError> {
        let comps = self.ops.connected_components(borders);
        for s in &comps.stats {
            if !self.is_chart_candidate(s, borders.width, borders.height) {
                continue;
            }
            let region = comps.mask(s.label);
            let contours: Vec<Contour> = self
                .ops
                .find_contours(&region)
                .into_iter()
                .map(|c| {
                    let eps = self.params.simplify * arc_length(&c);
                    self.ops.approx_polygon(&c, eps)
                })
                .collect();
            log::debug!(
                "chart candidate {} at ({}, {}) {}x{}: {} contours",
                s.label,
                s.left,
                s.top,
                s.width,
                s.height,
                contours.len()
            );
            if contours.len() >= min_contours {
                return Ok(contours);
            }
        }
        Err(ChartError::ChartNotFound)
    }

    fn filter_patches(&self, contours: &[Contour], width: usize, height: usize) -> Vec<ColorPatch> {
        let p = &self.params;
        let image_area = (width * height) as f64;
        let min_area = p.patch_min_area as f64 * image_area;
        let max_area = p.patch_max_area as f64 * image_area;

        let mut patches = Vec::new();
        for cont in contours {
            if cont.len() != 4 {
                continue;
            }
            let m = self.ops.moments(cont);
            if m.m00 < min_area || m.m00 > max_area {
                continue;
            }
            let Some(rect) = min_area_rect(cont) else {
                continue;
            };
            if rect.aspect_ratio() > p.max_aspect || !is_convex(cont) {
                continue;
            }
            let (Some(centroid), Some((x0, y0, x1, y1))) = (m.centroid(), bounding_box(cont))
            else {
                continue;
            };
            let bounds = PixelRect {
                x: x0.max(0) as usize,
                y: y0.max(0) as usize,
                width: (x1 - x0 + 1) as usize,
                height: (y1 - y0 + 1) as usize,
            };
            log::debug!(
                "patch {} at ({:.1}, {:.1}), area {:.0}",
                patches.len(),
                centroid.x,
                centroid.y,
                m.m00
            );
            patches.push(ColorPatch::new(Mask::from_rect(width, height, bounds), centroid));
        }
        patches
    }
}

/// Drop patches whose nearest neighbour is farther than `factor` times the
/// median nearest-neighbour distance.
pub fn remove_outliers(patches: Vec<ColorPatch>, factor: f32) -> Vec<ColorPatch> {
    if patches.len() < 2 {
        return patches;
    }
    let coords = patches
        .iter()
        .map(|p| [p.centroid.x, p.centroid.y])
        .collect::<Vec<_>>();
    let tree: KdTree<f32, 2> = (&coords).into();

    let nearest: Vec<f32> = coords
        .iter()
        .enumerate()
        .map(|(i, q)| {
            tree.nearest_n::<SquaredEuclidean>(q, 2)
                .into_iter()
                .find(|nn| nn.item as usize != i)
                .map(|nn| nn.distance.sqrt())
                .unwrap_or(f32::INFINITY)
        })
        .collect();

    let mut sorted = nearest.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let threshold = factor * sorted[sorted.len() / 2];

    patches
        .into_iter()
        .zip(nearest)
        .filter_map(|(patch, d)| {
            if d <= threshold {
                Some(patch)
            } else {
                log::debug!(
                    "dropping isolated patch at ({:.1}, {:.1}), nearest {:.1} > {:.1}",
                    patch.centroid.x,
                    patch.centroid.y,
                    d,
                    threshold
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point2;

    const W: usize = 800;
    const H: usize = 600;
    const LEFT: usize = 245;
    const TOP: usize = 195;
    const CELL: usize = 40;
    const LINE: usize = 10;

    /// 6x4 chart of flat patches separated by dark lines, centered on a
    /// mid-gray background. Returns the image and the patch centers in
    /// raster order.
    fn synthetic_chart() -> (GrayImage, Vec<Point2<f32>>) {
        let mut img = GrayImage::filled(W, H, 128);
        let chart_w = 6 * CELL + 7 * LINE;
        let chart_h = 4 * CELL + 5 * LINE;
        for y in TOP..TOP + chart_h {
            for x in LEFT..LEFT + chart_w {
                img.set(x, y, 10);
            }
        }
        let mut centers = Vec::new();
        for r in 0..4 {
            for c in 0..6 {
                let x0 = LEFT + LINE + c * (CELL + LINE);
                let y0 = TOP + LINE + r * (CELL + LINE);
                let v = 70 + ((r * 6 + c) * 2) as u8;
                for y in y0..y0 + CELL {
                    for x in x0..x0 + CELL {
                        img.set(x, y, v);
                    }
                }
                let half = (CELL as f32 - 1.0) / 2.0;
                centers.push(Point2::new(x0 as f32 + half, y0 as f32 + half));
            }
        }
        (img, centers)
    }

    #[test]
    fn finds_every_patch_of_a_synthetic_chart() {
        let (img, centers) = synthetic_chart();
        let detector = ChartDetector::default();
        let patches = detector
            .detect(&img, 6, 4, &mut DebugContext::disabled())
            .unwrap();
        assert_eq!(patches.len(), 24);

        let ordered = crate::order_patches(patches, 6, W);
        for (patch, truth) in ordered.iter().zip(&centers) {
            assert_abs_diff_eq!(patch.centroid.x, truth.x, epsilon = 2.0);
            assert_abs_diff_eq!(patch.centroid.y, truth.y, epsilon = 2.0);
            let b = patch.bounds();
            assert!(b.width > CELL / 2 && b.width <= CELL + 2);
        }
    }

    #[test]
    fn blank_image_has_no_chart() {
        let img = GrayImage::filled(320, 240, 128);
        let err = ChartDetector::default()
            .detect(&img, 6, 4, &mut DebugContext::disabled())
            .unwrap_err();
        assert!(matches!(err, ChartError::ChartNotFound));
    }

    #[test]
    fn off_center_chart_is_rejected() {
        let (img, _) = synthetic_chart();
        // Shift the chart into the left quarter of a wider canvas.
        let mut wide = GrayImage::filled(3 * W, H, 128);
        for y in 0..H {
            for x in 0..W {
                wide.set(x, y, img.get(x, y));
            }
        }
        let err = ChartDetector::default()
            .detect(&wide, 6, 4, &mut DebugContext::disabled())
            .unwrap_err();
        assert!(matches!(err, ChartError::ChartNotFound));
    }

    #[test]
    fn isolated_patch_is_an_outlier() {
        let mut patches: Vec<ColorPatch> = (0..9)
            .map(|i| {
                ColorPatch::new(
                    Mask::empty(500, 500),
                    Point2::new((i % 3) as f32 * 20.0, (i / 3) as f32 * 20.0),
                )
            })
            .collect();
        patches.push(ColorPatch::new(Mask::empty(500, 500), Point2::new(300.0, 300.0)));
        let kept = remove_outliers(patches, 2.0);
        assert_eq!(kept.len(), 9);
        assert!(kept.iter().all(|p| p.centroid.x < 100.0));
    }
}
