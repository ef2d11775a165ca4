//! Synthetic raw captures of a 6x4 chart.

#![allow(dead_code)]

use colorcal::{ReferenceChart, RawImage};
use nalgebra::{Matrix3, Vector3};
use std::path::Path;

pub const WIDTH: usize = 800;
pub const HEIGHT: usize = 600;
pub const LEFT: usize = 245;
pub const TOP: usize = 195;
pub const CELL: usize = 40;
pub const LINE: usize = 10;

/// Sensor pedestal in raw counts.
pub const BLACK: u16 = 2048;
const BACKGROUND: u16 = 20000;
const SCALE: f32 = 40000.0;
const GAIN: [f32; 3] = [0.6, 1.0, 0.8];

/// Channel crosstalk of the simulated sensor; rows sum to one.
pub fn crosstalk() -> Matrix3<f32> {
    Matrix3::new(0.8, 0.15, 0.05, 0.1, 0.8, 0.1, 0.05, 0.2, 0.75)
}

/// RGGB site color index.
fn channel(y: usize, x: usize) -> usize {
    [0, 1, 1, 2][(y % 2) * 2 + x % 2]
}

fn patch_counts(reference: Vector3<f32>) -> [u16; 3] {
    let mixed = crosstalk() * reference;
    [0, 1, 2].map(|c| (BLACK as f32 + SCALE * GAIN[c] * mixed[c]) as u16)
}

/// 16-bit RGGB mosaic: the Macbeth chart with dark grid lines on a
/// mid-gray background, plus a black disc (radius 30 at (100, 100)) that
/// reads exactly the pedestal.
pub fn synthetic_raw() -> RawImage {
    let mut data = vec![BACKGROUND; WIDTH * HEIGHT];
    let chart_w = 6 * CELL + 7 * LINE;
    let chart_h = 4 * CELL + 5 * LINE;
    for y in TOP..TOP + chart_h {
        for x in LEFT..LEFT + chart_w {
            data[y * WIDTH + x] = BLACK + 64;
        }
    }
    for (i, color) in ReferenceChart::macbeth().normalized().into_iter().enumerate() {
        let counts = patch_counts(color);
        let (x0, y0) = patch_origin(i);
        for y in y0..y0 + CELL {
            for x in x0..x0 + CELL {
                data[y * WIDTH + x] = counts[channel(y, x)];
            }
        }
    }
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let (dx, dy) = (x as i64 - 100, y as i64 - 100);
            if dx * dx + dy * dy <= 900 {
                data[y * WIDTH + x] = BLACK;
            }
        }
    }
    RawImage::from_u16(WIDTH, HEIGHT, data).unwrap()
}

/// Top-left pixel of patch `i` in raster order.
pub fn patch_origin(i: usize) -> (usize, usize) {
    let (r, c) = (i / 6, i % 6);
    (LEFT + LINE + c * (CELL + LINE), TOP + LINE + r * (CELL + LINE))
}

pub fn save_png(raw: &RawImage, path: &Path) {
    image::ImageBuffer::<image::Luma<u16>, _>::from_raw(
        raw.width as u32,
        raw.height as u32,
        raw.data.clone(),
    )
    .unwrap()
    .save(path)
    .unwrap();
}
