//! End-to-end calibration from one raw chart capture.

use crate::params::{to_array, write_black_level, write_intercept_x};
use crate::{
    load_raw_image, CalibError, CalibrationConfig, CalibrationParameters, CameraIsp,
    ColorErrors, ColorMatrixSolver, ColorResponse, ErrorReporter, IspConfig, SoftwareIsp,
};
use colorcal_chart::{
    measure_patches, order_patches, BlackLevelEstimator, ChartDetector, ColorPatch,
    DebugContext, MeasureImage, ReferenceChart,
};
use colorcal_core::{PixelRect, RawImage, RgbImage};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Ordered patch as reported after calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchSummary {
    pub index: usize,
    pub centroid: [f32; 2],
    pub bounds: PixelRect,
    /// Median of the demosaiced image before color correction.
    pub rgb_median: [f32; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub parameters: CalibrationParameters,
    pub response_raw: ColorResponse,
    pub response_white_balanced: ColorResponse,
    /// `[x_min, x_max]` the clamp bounds were evaluated at.
    pub clamp_range: [f32; 2],
    pub patches: Vec<PatchSummary>,
    pub errors_before: ColorErrors,
    pub errors_after: ColorErrors,
}

impl CalibrationOutcome {
    /// Write `black_level.txt`, `intercept_x.txt` and `calibration_report.json`
    /// into `dir`.
    pub fn write_files(&self, dir: &Path) -> Result<(), CalibError> {
        fs::create_dir_all(dir)?;
        write_black_level(dir.join("black_level.txt"), &self.parameters.black_level)?;
        write_intercept_x(dir.join("intercept_x.txt"), &self.response_white_balanced)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join("calibration_report.json"), json)?;
        Ok(())
    }
}

pub struct Calibrator {
    pub detector: ChartDetector,
    pub black_level: BlackLevelEstimator,
    pub solver: ColorMatrixSolver,
    pub reference: ReferenceChart,
    pub grid_width: usize,
    pub grid_height: usize,
    /// Skip estimation and use this normalized black level.
    pub black_level_override: Option<[f32; 3]>,
    pub gamma: [f32; 3],
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::from_config(&CalibrationConfig::new(""))
    }
}

impl Calibrator {
    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self {
            detector: ChartDetector::new(config.detector.clone()),
            black_level: BlackLevelEstimator::new(config.black_level_params.clone()),
            solver: ColorMatrixSolver::default(),
            reference: config.reference.clone(),
            grid_width: config.grid_width,
            grid_height: config.grid_height,
            black_level_override: config.black_level,
            gamma: config.gamma,
        }
    }

    /// Calibrate `isp` against the chart in `raw`. On success the ISP is
    /// configured with the returned parameters and holds the corrected image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = raw.width, height = raw.height))
    )]
    pub fn run<I: CameraIsp>(
        &self,
        raw: &RawImage,
        isp: &mut I,
        debug: &mut DebugContext,
    ) -> Result<CalibrationOutcome, CalibError> {
        let mut parameters = isp.parameters().clone();
        parameters.gamma = self.gamma;
        isp.load_image(raw);

        let gray = raw.to_gray8();
        let detected = self
            .detector
            .detect(&gray, self.grid_width, self.grid_height, debug)?;
        let mut patches = order_patches(detected, self.grid_width, raw.width);
        log::info!("{} patches after ordering", patches.len());
        if patches.len() != self.reference.len() {
            return Err(CalibError::CountMismatch {
                patches: patches.len(),
                reference: self.reference.len(),
            });
        }

        let black = match self.black_level_override {
            Some(b) => {
                log::info!("black level from configuration: {b:?}");
                Vector3::from(b)
            }
            None => self.black_level.estimate(raw, &*isp, debug)?,
        };
        parameters.black_level = to_array(&black);
        isp.configure(&parameters);
        isp.black_level_adjust();
        let response_raw = self.fit_raw(&*isp, &mut patches)?;
        let levels = response_raw.intercept_levels(raw.max_value());
        log::info!(
            "raw intercept in sensor levels [{:.1}, {:.1}, {:.1}]",
            levels.x,
            levels.y,
            levels.z
        );

        parameters.white_balance_gain = to_array(&response_raw.white_balance_gains());
        isp.configure(&parameters);
        isp.white_balance(false);
        let response_white_balanced = self.fit_raw(&*isp, &mut patches)?;

        let (x_min, x_max) = response_white_balanced.clamp_range();
        let (lo, hi) = response_white_balanced.clamp_bounds(x_min, x_max);
        log::info!("clamp x range [{x_min:.4}, {x_max:.4}]");
        parameters.clamp_min = to_array(&lo);
        parameters.clamp_max = to_array(&hi);
        isp.configure(&parameters);
        isp.clamp_and_stretch();

        isp.demosaic();
        let before = demosaiced(&*isp)?.clone();
        debug.save_rgb("demosaiced", &before)?;
        measure_patches(&mut patches, MeasureImage::Rgb(&before))?;
        let ccm = self.solver.solve(&patches, &self.reference)?;
        parameters.set_ccm(&ccm);

        isp.configure(&parameters);
        isp.color_correct();
        let after = demosaiced(&*isp)?;
        debug.save_rgb("color_corrected", after)?;
        let (errors_before, errors_after) =
            ErrorReporter::report(&before, after, &patches, &self.reference)?;

        Ok(CalibrationOutcome {
            parameters,
            response_raw,
            response_white_balanced,
            clamp_range: [x_min, x_max],
            patches: summarize(&patches),
            errors_before,
            errors_after,
        })
    }

    fn fit_raw<I: CameraIsp>(
        &self,
        isp: &I,
        patches: &mut [ColorPatch],
    ) -> Result<ColorResponse, CalibError> {
        measure_patches(
            patches,
            MeasureImage::Raw {
                image: isp.raw_image(),
                layout: isp,
            },
        )?;
        ColorResponse::fit(patches, &self.reference)
    }
}

fn demosaiced<I: CameraIsp>(isp: &I) -> Result<&RgbImage, CalibError> {
    isp.demosaiced_image().ok_or(CalibError::MissingIspOutput("demosaiced"))
}

fn summarize(patches: &[ColorPatch]) -> Vec<PatchSummary> {
    patches
        .iter()
        .enumerate()
        .map(|(index, p)| PatchSummary {
            index,
            centroid: [p.centroid.x, p.centroid.y],
            bounds: p.bounds(),
            rgb_median: p.rgb_median.map(|m| to_array(&m)).unwrap_or_default(),
        })
        .collect()
}

/// Load everything `config` names, calibrate with the software ISP and
/// write the results into `config.output_dir`.
pub fn run_from_config(config: &CalibrationConfig) -> Result<CalibrationOutcome, CalibError> {
    config.validate()?;
    let raw = load_raw_image(&config.image_path)?;
    let mut isp_config = match &config.isp_config_path {
        Some(path) => IspConfig::load_json(path)?,
        None => IspConfig::default(),
    };
    if let Some(pattern) = config.bayer_pattern {
        isp_config.bayer_pattern = pattern;
    }
    let mut isp = SoftwareIsp::new(isp_config);

    let mut debug = if config.save_debug {
        DebugContext::new(&config.output_dir)
    } else {
        DebugContext::disabled()
    };

    let outcome = Calibrator::from_config(config).run(&raw, &mut isp, &mut debug)?;
    outcome.write_files(&config.output_dir)?;
    isp.dump_config(&config.output_dir.join("isp_out.json"))?;
    log::info!("results written to {}", config.output_dir.display());
    Ok(outcome)
}
