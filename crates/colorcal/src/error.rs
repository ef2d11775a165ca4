use colorcal_chart::ChartError;

/// Errors produced by the calibration pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("detected {patches} patches but the reference chart has {reference}")]
    CountMismatch { patches: usize, reference: usize },

    #[error("regression returned a {rows}x{cols} matrix, expected 3x3")]
    DimensionMismatch { rows: usize, cols: usize },

    #[error("ISP returned no {0} image")]
    MissingIspOutput(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
