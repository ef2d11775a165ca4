//! Row-major ordering of detected patches.
//!
//! Rows are peeled off one at a time: the current top-left and top-right
//! patches define a line, the `grid_width` patches closest to it form the
//! row, and the row is read left to right. This tolerates rotation and
//! perspective better than binning by `y`.
//!
//! Ties in line distance keep detection order (the selection sort is stable
//! and the remaining patches are never reshuffled).

use crate::ColorPatch;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

fn nearest_to(points: &[Point2<f32>], target: Point2<f32>) -> usize {
    let mut best = 0;
    let mut best_d = f32::INFINITY;
    for (i, p) in points.iter().enumerate() {
        let d = (p - target).norm();
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
pub fn point_to_line_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let len = (b - a).norm();
    if len <= f32::EPSILON {
        return (p.y - a.y).abs();
    }
    ((b.y - a.y) * p.x - (b.x - a.x) * p.y + b.x * a.y - b.y * a.x).abs() / len
}

/// Sort `patches` into the chart's raster order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(patches), fields(patches = patches.len()))
)]
pub fn order_patches(
    patches: Vec<ColorPatch>,
    grid_width: usize,
    image_width: usize,
) -> Vec<ColorPatch> {
    let grid_width = grid_width.max(1);
    let top_left_ref = Point2::new(0.0, 0.0);
    let top_right_ref = Point2::new(image_width as f32, 0.0);

    let mut remaining = patches;
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let centroids: Vec<Point2<f32>> = remaining.iter().map(|p| p.centroid).collect();
        let a = centroids[nearest_to(&centroids, top_left_ref)];
        let b = centroids[nearest_to(&centroids, top_right_ref)];

        let dist: Vec<f32> = centroids
            .iter()
            .map(|&c| point_to_line_distance(c, a, b))
            .collect();
        let mut by_dist: Vec<usize> = (0..remaining.len()).collect();
        by_dist.sort_by(|&i, &j| dist[i].total_cmp(&dist[j]));

        let mut in_row = vec![false; remaining.len()];
        for &i in by_dist.iter().take(grid_width) {
            in_row[i] = true;
        }

        let mut row = Vec::with_capacity(grid_width);
        let mut rest = Vec::with_capacity(remaining.len());
        for (patch, take) in remaining.into_iter().zip(in_row) {
            if take {
                row.push(patch);
            } else {
                rest.push(patch);
            }
        }
        row.sort_by(|p, q| p.centroid.x.total_cmp(&q.centroid.x));
        log::debug!(
            "row {}: {} patches, y ~ {:.1}",
            ordered.len() / grid_width,
            row.len(),
            row.iter().map(|p| p.centroid.y).sum::<f32>() / row.len() as f32
        );
        ordered.extend(row);
        remaining = rest;
    }
    ordered
}
