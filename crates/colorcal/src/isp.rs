//! Camera ISP contract and a software reference implementation.
//!
//! The calibration pipeline drives an ISP through [`CameraIsp`]: it loads
//! the raw capture, applies one stage at a time and reads the buffer back
//! to measure patches. [`SoftwareIsp`] runs the stages on the CPU with
//! normalized floats.

use crate::{CalibError, CalibrationParameters};
use colorcal_core::{BayerPattern, Channel, ChannelAssignment, FloatImage, RawImage, RgbImage};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Stage-by-stage access to an image pipeline holding one image buffer.
pub trait CameraIsp: ChannelAssignment {
    fn configure(&mut self, parameters: &CalibrationParameters);
    fn parameters(&self) -> &CalibrationParameters;

    /// Replace the buffer with `raw` normalized to `[0, 1]`.
    fn load_image(&mut self, raw: &RawImage);
    fn set_raw_image(&mut self, image: FloatImage);
    fn raw_image(&self) -> &FloatImage;

    fn black_level_adjust(&mut self);
    /// Multiply by the white-balance gains, saturating at 1 when `clamp`.
    fn white_balance(&mut self, clamp: bool);
    /// Clip each channel to its clamp bounds and stretch them to `[0, 1]`.
    fn clamp_and_stretch(&mut self);
    fn demosaic(&mut self);
    /// `None` before the first [`CameraIsp::demosaic`].
    fn demosaiced_image(&self) -> Option<&RgbImage>;
    fn set_demosaiced_image(&mut self, image: RgbImage);
    /// Apply the CCM and gamma to the demosaiced image.
    fn color_correct(&mut self);

    fn dump_config(&self, path: &Path) -> Result<(), CalibError>;
}

/// Serialized ISP state: the mosaic layout and the calibrated parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IspConfig {
    pub bayer_pattern: BayerPattern,
    pub parameters: CalibrationParameters,
}

impl IspConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SoftwareIsp {
    pattern: BayerPattern,
    parameters: CalibrationParameters,
    raw: FloatImage,
    rgb: Option<RgbImage>,
}

impl SoftwareIsp {
    pub fn new(config: IspConfig) -> Self {
        Self {
            pattern: config.bayer_pattern,
            parameters: config.parameters,
            raw: FloatImage::filled(0, 0, 0.0),
            rgb: None,
        }
    }

    pub fn config(&self) -> IspConfig {
        IspConfig {
            bayer_pattern: self.pattern,
            parameters: self.parameters.clone(),
        }
    }

    /// Apply `f(channel, value)` to every raw site.
    fn map_raw(&mut self, f: impl Fn(usize, f32) -> f32) {
        let width = self.raw.width;
        for (i, v) in self.raw.data.iter_mut().enumerate() {
            let ch = self.pattern.channel_at(i / width, i % width).index();
            *v = f(ch, *v);
        }
    }

    fn interpolate(&self, x: usize, y: usize, channel: Channel) -> f32 {
        if self.channel_at(y, x) == channel {
            return self.raw.get(x, y);
        }
        let (w, h) = (self.raw.width, self.raw.height);
        let mut sum = 0.0;
        let mut count = 0;
        for ny in y.saturating_sub(1)..(y + 2).min(h) {
            for nx in x.saturating_sub(1)..(x + 2).min(w) {
                if self.channel_at(ny, nx) == channel {
                    sum += self.raw.get(nx, ny);
                    count += 1;
                }
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

impl Default for SoftwareIsp {
    fn default() -> Self {
        Self::new(IspConfig::default())
    }
}

impl ChannelAssignment for SoftwareIsp {
    fn channel_at(&self, row: usize, col: usize) -> Channel {
        self.pattern.channel_at(row, col)
    }
}

impl CameraIsp for SoftwareIsp {
    fn configure(&mut self, parameters: &CalibrationParameters) {
        self.parameters = parameters.clone();
    }

    fn parameters(&self) -> &CalibrationParameters {
        &self.parameters
    }

    fn load_image(&mut self, raw: &RawImage) {
        self.set_raw_image(raw.normalized());
    }

    fn set_raw_image(&mut self, image: FloatImage) {
        self.raw = image;
        self.rgb = None;
    }

    fn raw_image(&self) -> &FloatImage {
        &self.raw
    }

    fn black_level_adjust(&mut self) {
        let black = self.parameters.black_level;
        self.map_raw(|c, v| {
            let b = black[c];
            if b >= 1.0 {
                0.0
            } else {
                ((v - b) / (1.0 - b)).max(0.0)
            }
        });
    }

    fn white_balance(&mut self, clamp: bool) {
        let gain = self.parameters.white_balance_gain;
        self.map_raw(|c, v| {
            let out = v * gain[c];
            if clamp {
                out.min(1.0)
            } else {
                out
            }
        });
    }

    fn clamp_and_stretch(&mut self) {
        let lo = self.parameters.clamp_min;
        let hi = self.parameters.clamp_max;
        self.map_raw(|c, v| {
            let span = (hi[c] - lo[c]).max(f32::EPSILON);
            (v.max(lo[c]).min(hi[c]) - lo[c]) / span
        });
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self), fields(width = self.raw.width, height = self.raw.height))
    )]
    fn demosaic(&mut self) {
        let (w, h) = (self.raw.width, self.raw.height);
        let mut rgb = RgbImage::filled(w, h, [0.0; 3]);
        for y in 0..h {
            for x in 0..w {
                let px = Channel::ALL.map(|c| self.interpolate(x, y, c));
                rgb.set(x, y, px);
            }
        }
        self.rgb = Some(rgb);
    }

    fn demosaiced_image(&self) -> Option<&RgbImage> {
        self.rgb.as_ref()
    }

    fn set_demosaiced_image(&mut self, image: RgbImage) {
        self.rgb = Some(image);
    }

    fn color_correct(&mut self) {
        if self.rgb.is_none() {
            self.demosaic();
        }
        let ccm = self.parameters.ccm_matrix();
        let gamma = self.parameters.gamma;
        if let Some(rgb) = self.rgb.as_mut() {
            for px in rgb.data.iter_mut() {
                let v = ccm * Vector3::new(px[0], px[1], px[2]);
                for (c, out) in px.iter_mut().enumerate() {
                    *out = v[c].clamp(0.0, 1.0).powf(gamma[c]);
                }
            }
        }
    }

    fn dump_config(&self, path: &Path) -> Result<(), CalibError> {
        self.config().write_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorResponse;
    use approx::assert_relative_eq;

    fn mosaic(pattern: BayerPattern, w: usize, h: usize, rgb: [f32; 3]) -> FloatImage {
        let mut img = FloatImage::filled(w, h, 0.0);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, rgb[pattern.channel_at(y, x).index()]);
            }
        }
        img
    }

    fn isp_with(parameters: CalibrationParameters) -> SoftwareIsp {
        SoftwareIsp::new(IspConfig {
            bayer_pattern: BayerPattern::Rggb,
            parameters,
        })
    }

    #[test]
    fn black_level_is_subtracted_and_rescaled() {
        let mut isp = isp_with(CalibrationParameters {
            black_level: [0.2, 0.2, 0.2],
            ..Default::default()
        });
        isp.set_raw_image(FloatImage::filled(2, 2, 0.6));
        isp.black_level_adjust();
        assert_relative_eq!(isp.raw_image().get(0, 0), 0.5, epsilon = 1e-6);

        isp.set_raw_image(FloatImage::filled(2, 2, 0.1));
        isp.black_level_adjust();
        assert_eq!(isp.raw_image().get(1, 1), 0.0);
    }

    #[test]
    fn white_balance_clamps_on_request() {
        let mut isp = isp_with(CalibrationParameters {
            white_balance_gain: [2.0, 1.0, 4.0],
            ..Default::default()
        });
        isp.set_raw_image(mosaic(BayerPattern::Rggb, 4, 4, [0.3, 0.5, 0.4]));
        isp.white_balance(false);
        assert_relative_eq!(isp.raw_image().get(0, 0), 0.6, epsilon = 1e-6);
        assert_relative_eq!(isp.raw_image().get(1, 1), 1.6, epsilon = 1e-6);

        isp.set_raw_image(mosaic(BayerPattern::Rggb, 4, 4, [0.3, 0.5, 0.4]));
        isp.white_balance(true);
        assert_eq!(isp.raw_image().get(1, 1), 1.0);
    }

    #[test]
    fn identity_clamp_bounds_are_a_no_op() {
        let response = ColorResponse::from_anchors(0.0, Vector3::zeros(), 1.0, Vector3::repeat(1.0));
        let (x_min, x_max) = response.clamp_range();
        let (lo, hi) = response.clamp_bounds(x_min, x_max);
        let mut isp = isp_with(CalibrationParameters {
            clamp_min: [lo.x, lo.y, lo.z],
            clamp_max: [hi.x, hi.y, hi.z],
            ..Default::default()
        });
        let img = mosaic(BayerPattern::Rggb, 6, 6, [0.0, 0.35, 1.0]);
        isp.set_raw_image(img.clone());
        isp.clamp_and_stretch();
        assert_eq!(isp.raw_image(), &img);
        isp.clamp_and_stretch();
        assert_eq!(isp.raw_image(), &img);
    }

    #[test]
    fn clamp_and_stretch_maps_bounds_to_unit_range() {
        let mut isp = isp_with(CalibrationParameters {
            clamp_min: [0.25; 3],
            clamp_max: [0.75; 3],
            ..Default::default()
        });
        isp.set_raw_image(FloatImage {
            width: 4,
            height: 1,
            data: vec![0.1, 0.25, 0.5, 0.9],
        });
        isp.clamp_and_stretch();
        assert_eq!(isp.raw_image().data, vec![0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn flat_mosaic_demosaics_to_flat_color() {
        for pattern in [
            BayerPattern::Rggb,
            BayerPattern::Bggr,
            BayerPattern::Grbg,
            BayerPattern::Gbrg,
        ] {
            let mut isp = SoftwareIsp::new(IspConfig {
                bayer_pattern: pattern,
                ..Default::default()
            });
            isp.set_raw_image(mosaic(pattern, 7, 5, [0.2, 0.5, 0.8]));
            isp.demosaic();
            let rgb = isp.demosaiced_image().unwrap();
            for px in &rgb.data {
                assert_relative_eq!(px[0], 0.2, epsilon = 1e-6);
                assert_relative_eq!(px[1], 0.5, epsilon = 1e-6);
                assert_relative_eq!(px[2], 0.8, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn color_correction_applies_ccm_then_gamma() {
        let mut parameters = CalibrationParameters {
            gamma: [1.0, 2.0, 1.0],
            ..Default::default()
        };
        parameters.ccm = [[0.5, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 3.0]];
        let mut isp = isp_with(parameters);
        isp.set_demosaiced_image(RgbImage::filled(2, 2, [0.8, 0.5, 0.5]));
        isp.color_correct();
        let px = isp.demosaiced_image().unwrap().get(1, 0);
        assert_relative_eq!(px[0], 0.4, epsilon = 1e-6);
        assert_relative_eq!(px[1], 0.25, epsilon = 1e-6);
        assert_eq!(px[2], 1.0);
    }

    #[test]
    fn config_dump_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isp.json");
        let isp = isp_with(CalibrationParameters {
            black_level: [0.03, 0.031, 0.029],
            ..Default::default()
        });
        isp.dump_config(&path).unwrap();
        assert_eq!(IspConfig::load_json(&path).unwrap(), isp.config());
    }

    #[test]
    fn configured_pattern_drives_the_channel_layout() {
        let isp = SoftwareIsp::new(IspConfig {
            bayer_pattern: BayerPattern::Gbrg,
            ..Default::default()
        });
        assert_eq!(isp.config().bayer_pattern, BayerPattern::Gbrg);
        assert_eq!(isp.channel_at(0, 0), Channel::Green);
        assert_eq!(isp.channel_at(0, 1), Channel::Blue);
        assert_eq!(isp.channel_at(1, 0), Channel::Red);
    }
}
