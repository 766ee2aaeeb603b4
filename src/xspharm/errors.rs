// xspharm/src/xspharm/errors.rs

use crate::adapter::DimensionMismatchError;
use crate::engine::{EngineFailureError, SpharmtBuilderError};
use crate::grid::{GridType, InvalidGridError};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Truncation {ntrunc} is outside the resolvable range [{min}, {max}]")]
pub struct TruncationRangeError {
    pub ntrunc: usize,
    pub min: usize,
    pub max: usize,
}

#[derive(Error, Debug)]
pub enum XspharmError {
    #[error("Unitialized field on XspharmBuilder: {0}")]
    UninitializedFieldError(String),
    #[error(transparent)]
    InvalidGrid(#[from] InvalidGridError),
    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatchError),
    #[error(transparent)]
    TruncationRange(#[from] TruncationRangeError),
    #[error(transparent)]
    EngineFailure(#[from] EngineFailureError),
    #[error(transparent)]
    SpharmtBuilder(#[from] SpharmtBuilderError),
    #[error("Taper order r must be finite and > 0, but got {0}")]
    InvalidTaperOrder(f64),
    #[error("{0} must be finite, but got {1}")]
    InvalidEarthParameter(&'static str, f64),
    #[error("Engine grid ({engine_nlat}, {engine_nlon}) differs from the reference grid ({nlat}, {nlon})")]
    EngineGridMismatch {
        engine_nlat: usize,
        engine_nlon: usize,
        nlat: usize,
        nlon: usize,
    },
    #[error("Engine was built for a {engine} grid but the reference grid is {grid}")]
    EngineGridTypeMismatch { engine: GridType, grid: GridType },
}
