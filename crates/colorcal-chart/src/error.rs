/// Errors returned by chart detection and patch measurement.
#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("no chart found")]
    ChartNotFound,
    #[error("no black region found")]
    NoBlackRegion,
    #[error("patch {index} has an empty mask")]
    EmptyPatch { index: usize },
    #[error("patch {index} has not been measured")]
    UnmeasuredPatch { index: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
