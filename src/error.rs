use thiserror::Error;

use crate::raster::RasterError;

/// Errors which abort an operation and are reported to the caller.
///
/// Per-sample conditions met while regrouping (a pixel without a geometric
/// solution, a sample with too little coverage) are not errors: see
/// [`crate::waxs::Failure`] and [`crate::ipol::Rejected`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid reference system: {0}")]
    InvalidReferenceSystem(String),

    #[error("geometry not initialized: {0}")]
    UninitializedGeometry(&'static str),

    #[error("polarization parameter out of range: {0}")]
    OutOfRangePolarization(String),

    #[error("geometric transform has no solution")]
    NoSolution,

    #[error("interpolation weight below the coverage threshold")]
    InsufficientCoverage,

    #[error("all source pixels are dummies")]
    DummySource,

    #[error("expression: {0}")]
    Program(#[from] units::expr::Error),

    #[error("raster configuration: {0}")]
    Raster(#[from] RasterError),

    #[error("dimension mismatch: {0}")]
    Dimensions(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
