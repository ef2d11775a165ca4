//! JSON run configuration and raw image loading.

use crate::CalibError;
use colorcal_chart::{BlackLevelParams, ChartDetectorParams, ReferenceChart};
use colorcal_core::{BayerPattern, RawImage};
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_grid_width() -> usize {
    6
}

fn default_grid_height() -> usize {
    4
}

fn default_gamma() -> [f32; 3] {
    [1.0; 3]
}

/// One calibration run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub image_path: PathBuf,
    /// Starting ISP configuration. Defaults to an identity RGGB pipeline.
    #[serde(default)]
    pub isp_config_path: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_grid_width")]
    pub grid_width: usize,
    #[serde(default = "default_grid_height")]
    pub grid_height: usize,
    /// Normalized black level; estimated from the image when absent.
    #[serde(default)]
    pub black_level: Option<[f32; 3]>,
    #[serde(default = "default_gamma")]
    pub gamma: [f32; 3],
    #[serde(default)]
    pub save_debug: bool,
    /// Overrides the pattern from the ISP configuration.
    #[serde(default)]
    pub bayer_pattern: Option<BayerPattern>,
    #[serde(default)]
    pub reference: ReferenceChart,
    #[serde(default)]
    pub detector: ChartDetectorParams,
    #[serde(default)]
    pub black_level_params: BlackLevelParams,
}

impl CalibrationConfig {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            isp_config_path: None,
            output_dir: default_output_dir(),
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
            black_level: None,
            gamma: default_gamma(),
            save_debug: false,
            bayer_pattern: None,
            reference: ReferenceChart::default(),
            detector: ChartDetectorParams::default(),
            black_level_params: BlackLevelParams::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings no run can succeed with.
    pub fn validate(&self) -> Result<(), CalibError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(CalibError::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.grid_width * self.grid_height != self.reference.len() {
            return Err(CalibError::InvalidConfig(format!(
                "{}x{} grid does not match the {} colors of chart '{}'",
                self.grid_width,
                self.grid_height,
                self.reference.len(),
                self.reference.name
            )));
        }
        if let Some(black) = self.black_level {
            if black.iter().any(|b| !(0.0..1.0).contains(b)) {
                return Err(CalibError::InvalidConfig(format!(
                    "black level {black:?} outside [0, 1)"
                )));
            }
        }
        Ok(())
    }
}

/// Decode a single-channel raw capture. 16-bit formats keep their depth;
/// anything else is read as 8-bit luma.
pub fn load_raw_image(path: impl AsRef<Path>) -> Result<RawImage, CalibError> {
    let path = path.as_ref();
    let img = ImageReader::open(path)?.decode()?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let raw = match img {
        DynamicImage::ImageLuma8(buf) => RawImage::from_u8(w, h, buf.as_raw()),
        DynamicImage::ImageLuma16(buf) => RawImage::from_u16(w, h, buf.into_raw()),
        other @ (DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_)) => {
            log::warn!("{}: multi-channel 16-bit image, using luma", path.display());
            RawImage::from_u16(w, h, other.to_luma16().into_raw())
        }
        other => {
            log::warn!("{}: not a single-channel image, using 8-bit luma", path.display());
            RawImage::from_u8(w, h, other.to_luma8().as_raw())
        }
    }
    .map_err(|e| CalibError::InvalidConfig(format!("{}: {e}", path.display())))?;
    log::info!(
        "loaded {} ({}x{}, {}-bit)",
        path.display(),
        raw.width,
        raw.height,
        raw.depth.bits()
    );
    Ok(raw)
}
