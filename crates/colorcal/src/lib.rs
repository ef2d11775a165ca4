//! Colorimetric camera calibration from a photographed color chart.
//!
//! The pipeline detects the chart's patches in a raw capture, estimates the
//! sensor black level, fits a per-channel response on the gray series for
//! white balance and clamp bounds, and regresses a color-correction matrix
//! against the reference colors. The ISP it calibrates is reached through
//! [`CameraIsp`]; [`SoftwareIsp`] is a CPU reference.
//!
//! ## Quickstart
//!
//! ```no_run
//! use colorcal::{run_from_config, CalibrationConfig};
//!
//! # fn main() -> Result<(), colorcal::CalibError> {
//! let mut config = CalibrationConfig::new("chart_raw.png");
//! config.output_dir = "calibration".into();
//! let outcome = run_from_config(&config)?;
//! println!("ccm: {:?}", outcome.parameters.ccm);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `colorcal::core`: image containers, channel layout, vision primitives.
//! - `colorcal::chart`: patch detection, ordering, statistics, black level.
//! - this crate: response model, CCM solver, error report, ISP, pipeline.

pub use colorcal_chart as chart;
pub use colorcal_core as core;

mod ccm;
mod config;
mod error;
mod isp;
mod params;
mod pipeline;
mod regression;
mod report;
mod response;

pub use ccm::ColorMatrixSolver;
pub use config::{load_raw_image, CalibrationConfig};
pub use error::CalibError;
pub use isp::{CameraIsp, IspConfig, SoftwareIsp};
pub use params::{write_black_level, write_intercept_x, CalibrationParameters};
pub use pipeline::{run_from_config, CalibrationOutcome, Calibrator, PatchSummary};
pub use regression::solve_linear_regression;
pub use report::{ColorErrors, ErrorReporter};
pub use response::ColorResponse;

pub use colorcal_chart::{ChartError, ColorPatch, DebugContext, ReferenceChart};
pub use colorcal_core::{BayerPattern, RawImage};
