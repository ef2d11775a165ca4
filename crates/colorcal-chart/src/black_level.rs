//! Sensor black level from a dark disc in the raw capture.
//!
//! Each channel is thresholded at its lowest well-populated histogram bin.
//! The union of the dark pixels is split into contours; roughly circular
//! blobs are candidates, and the candidate whose raw median is closest to
//! zero gives the black level.

use crate::stats::raw_median;
use crate::{BlackLevelParams, ChartError, DebugContext};
use colorcal_core::contour::{arc_length, contour_area, min_enclosing_circle};
use colorcal_core::{
    ChannelAssignment, Contour, CpuImageOps, GrayImage, ImageOps, Mask, RawImage,
};
use nalgebra::Vector3;

#[cfg(feature = "tracing")]
use tracing::instrument;

pub struct BlackLevelEstimator<O = CpuImageOps> {
    ops: O,
    params: BlackLevelParams,
}

impl BlackLevelEstimator<CpuImageOps> {
    pub fn new(params: BlackLevelParams) -> Self {
        Self::with_ops(CpuImageOps, params)
    }
}

impl Default for BlackLevelEstimator<CpuImageOps> {
    fn default() -> Self {
        Self::new(BlackLevelParams::default())
    }
}

/// Lowest bin below `limit` that starts a run of `run` bins, each holding
/// more than `floor` samples.
fn histogram_threshold(hist: &[usize], limit: usize, floor: usize, run: usize) -> Option<usize> {
    let run = run.max(1);
    let limit = limit.min(hist.len());
    (0..limit).find(|&h| h + run <= limit && hist[h..h + run].iter().all(|&c| c > floor))
}

impl<O: ImageOps> BlackLevelEstimator<O> {
    pub fn with_ops(ops: O, params: BlackLevelParams) -> Self {
        Self { ops, params }
    }

    #[inline]
    pub fn params(&self) -> &BlackLevelParams {
        &self.params
    }

    /// Per-channel black level, normalized to `[0, 1]`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, raw, layout, debug), fields(width = raw.width, height = raw.height))
    )]
    pub fn estimate(
        &self,
        raw: &RawImage,
        layout: &dyn ChannelAssignment,
        debug: &mut DebugContext,
    ) -> Result<Vector3<f32>, ChartError> {
        let dark = self.dark_mask(raw, layout);
        let candidates = self.candidate_regions(&dark);
        log::debug!("{} black-region candidates", candidates.len());

        if debug.is_enabled() {
            let mut plot = GrayImage::new(raw.width, raw.height);
            for c in &candidates {
                self.ops.fill_polygon(&mut plot, c, 255);
            }
            debug.save_gray("contours_filtered", &plot)?;
        }

        let normalized = raw.normalized();
        let mut best: Option<(Vector3<f32>, Mask)> = None;
        for contour in &candidates {
            let mut filled = GrayImage::new(raw.width, raw.height);
            self.ops.fill_polygon(&mut filled, contour, 255);
            let mask = Mask::from_gray(&filled);
            let Some(median) = raw_median(&normalized, layout, &mask) else {
                continue;
            };
            if best.as_ref().is_none_or(|(b, _)| median.norm() < b.norm()) {
                best = Some((median, mask));
            }
        }
        let (level, mask) = best.ok_or(ChartError::NoBlackRegion)?;

        if debug.is_enabled() {
            let gray = raw.to_gray8();
            let mut rgb: Vec<u8> = gray.data.iter().flat_map(|&v| [v, v, v]).collect();
            for (x, y) in mask.iter_set() {
                let i = 3 * (y * raw.width + x);
                rgb[i..i + 3].copy_from_slice(&[0, 255, 0]);
            }
            debug.save_rgb8("black_hole_mask", raw.width, raw.height, &rgb)?;
        }

        let scale = raw.max_value() as f32;
        log::info!(
            "black level ({}-bit): [{:.2}, {:.2}, {:.2}]",
            raw.depth.bits(),
            level.x * scale,
            level.y * scale,
            level.z * scale
        );
        Ok(level)
    }

    /// Union over channels of the samples at or below that channel's
    /// histogram threshold.
    fn dark_mask(&self, raw: &RawImage, layout: &dyn ChannelAssignment) -> GrayImage {
        let max = raw.max_value() as usize;
        let mut hists = vec![vec![0usize; max + 1]; 3];
        // Sites of other channels sit at the top bin, which is never a threshold.
        let mut unused = [0usize; 3];
        for y in 0..raw.height {
            for x in 0..raw.width {
                let ch = layout.channel_at(y, x).index();
                hists[ch][raw.get(x, y) as usize] += 1;
                for (other, u) in unused.iter_mut().enumerate() {
                    if other != ch {
                        *u += 1;
                    }
                }
            }
        }
        for (hist, u) in hists.iter_mut().zip(unused) {
            hist[max] += u;
        }

        let thresholds: Vec<Option<u16>> = hists
            .iter()
            .map(|hist| {
                histogram_threshold(
                    hist,
                    max,
                    self.params.min_pixel_count,
                    self.params.min_run_bins,
                )
                .map(|h| h as u16)
            })
            .collect();
        log::debug!("black thresholds per channel: {thresholds:?}");

        let mut mask = GrayImage::new(raw.width, raw.height);
        for y in 0..raw.height {
            for x in 0..raw.width {
                let ch = layout.channel_at(y, x).index();
                if thresholds[ch].is_some_and(|t| raw.get(x, y) <= t) {
                    mask.set(x, y, 255);
                }
            }
        }
        mask
    }

    /// Simplified contours of large, round dark blobs.
    fn candidate_regions(&self, dark: &GrayImage) -> Vec<Contour> {
        let p = &self.params;
        self.ops
            .find_contours(dark)
            .into_iter()
            .map(|c| {
                let eps = p.simplify * arc_length(&c);
                self.ops.approx_polygon(&c, eps)
            })
            .filter(|c| {
                let area = contour_area(c).floor();
                if area < p.min_pixel_count as f64 || c.len() < p.min_vertices {
                    return false;
                }
                min_enclosing_circle(c)
                    .is_some_and(|circle| area as f32 / circle.area() >= p.min_circularity)
            })
            .collect()
    }
}
