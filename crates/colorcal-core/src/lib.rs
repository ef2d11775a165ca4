//! Image containers, sensor channel layout and vision primitives for
//! color-chart calibration.
//!
//! Nothing here knows about charts or calibration parameters; the
//! detectors in `colorcal-chart` are written against [`ops::ImageOps`].

mod channel;
pub mod contour;
mod image;
mod logger;
mod mask;
pub mod ops;

pub use channel::{BayerPattern, Channel, ChannelAssignment};
pub use image::{BitDepth, FloatImage, GrayImage, ImageBufferError, RawImage, RgbImage};
pub use mask::{Mask, PixelRect};

pub use contour::{Circle, Contour, Moments, RotatedRect};
pub use ops::{CpuImageOps, ImageOps};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
