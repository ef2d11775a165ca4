//! Color-chart detection and measurement.
//!
//! - [`ChartDetector`] segments a photograph of a ColorChecker-style chart
//!   into per-patch masks,
//! - [`order_patches`] puts them into the chart's raster order,
//! - [`measure_patches`] fills in per-patch RGB medians,
//! - [`BlackLevelEstimator`] finds the sensor black level from a dark disc.
//!
//! Image processing goes through [`colorcal_core::ImageOps`].

mod black_level;
mod debug;
mod detector;
mod error;
mod order;
mod params;
mod patch;
mod reference;
mod stats;

pub use black_level::BlackLevelEstimator;
pub use debug::{overlay_patches, DebugContext};
pub use detector::{remove_outliers, ChartDetector};
pub use error::ChartError;
pub use order::{order_patches, point_to_line_distance};
pub use params::{BlackLevelParams, ChartDetectorParams};
pub use patch::{patch_medians, ColorPatch};
pub use reference::ReferenceChart;
pub use stats::{mask_median, measure_patches, raw_median, rgb_median, select_median, MeasureImage};
