//! Numbered debug images.
//!
//! Every saved artifact takes the next step index, so file names sort in
//! pipeline order: `1_scaled_blurred.png`, `2_adaptive_threshold.png`, ...

use crate::{ChartError, ColorPatch};
use colorcal_core::{GrayImage, RgbImage};
use image::ColorType;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct DebugContext {
    output_dir: Option<PathBuf>,
    step: usize,
}

impl DebugContext {
    /// Context that never writes anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: Some(output_dir.into()),
            step: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.output_dir.is_some()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Index of the last saved artifact.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn next_step(&mut self) -> usize {
        self.step += 1;
        self.step
    }

    fn next_path(&mut self, name: &str) -> Result<Option<PathBuf>, ChartError> {
        let Some(dir) = self.output_dir.clone() else {
            return Ok(None);
        };
        fs::create_dir_all(&dir)?;
        let step = self.next_step();
        Ok(Some(dir.join(format!("{step}_{name}.png"))))
    }

    pub fn save_gray(&mut self, name: &str, img: &GrayImage) -> Result<Option<PathBuf>, ChartError> {
        let Some(path) = self.next_path(name)? else {
            return Ok(None);
        };
        image::save_buffer(
            &path,
            &img.data,
            img.width as u32,
            img.height as u32,
            ColorType::L8,
        )?;
        log::debug!("wrote {}", path.display());
        Ok(Some(path))
    }

    /// Save interleaved 8-bit RGB.
    pub fn save_rgb8(
        &mut self,
        name: &str,
        width: usize,
        height: usize,
        data: &[u8],
    ) -> Result<Option<PathBuf>, ChartError> {
        let Some(path) = self.next_path(name)? else {
            return Ok(None);
        };
        image::save_buffer(&path, data, width as u32, height as u32, ColorType::Rgb8)?;
        log::debug!("wrote {}", path.display());
        Ok(Some(path))
    }

    pub fn save_rgb(&mut self, name: &str, img: &RgbImage) -> Result<Option<PathBuf>, ChartError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        self.save_rgb8(name, img.width, img.height, &img.to_rgb8())
    }
}

/// Gray image with each patch's mask outlined in green and its centroid
/// marked, as interleaved RGB.
pub fn overlay_patches(gray: &GrayImage, patches: &[ColorPatch]) -> Vec<u8> {
    let mut rgb: Vec<u8> = gray.data.iter().flat_map(|&v| [v, v, v]).collect();
    let mut paint = |x: usize, y: usize| {
        if x < gray.width && y < gray.height {
            let i = 3 * (y * gray.width + x);
            rgb[i..i + 3].copy_from_slice(&[0, 255, 0]);
        }
    };
    for patch in patches {
        let r = patch.bounds();
        if r.area() == 0 {
            continue;
        }
        let (x1, y1) = (r.x + r.width - 1, r.y + r.height - 1);
        for x in r.x..=x1 {
            paint(x, r.y);
            paint(x, y1);
        }
        for y in r.y..=y1 {
            paint(r.x, y);
            paint(x1, y);
        }
        let cx = patch.centroid.x.round().max(0.0) as usize;
        let cy = patch.centroid.y.round().max(0.0) as usize;
        for d in 0..=2 {
            paint(cx + d, cy);
            paint(cx.saturating_sub(d), cy);
            paint(cx, cy + d);
            paint(cx, cy.saturating_sub(d));
        }
    }
    rgb
}
