// xspharm/src/engine/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineFailureError {
    #[error("{0} received non-finite input values")]
    NonFiniteInput(&'static str),
    #[error("{0} produced non-finite output values")]
    NonFiniteOutput(&'static str),
    #[error("{operation} expects a grid of shape ({expected_nlat}, {expected_nlon}), but got ({nlat}, {nlon})")]
    ShapeMismatch {
        operation: &'static str,
        expected_nlat: usize,
        expected_nlon: usize,
        nlat: usize,
        nlon: usize,
    },
    #[error("{operation} expects coefficients truncated at the same wavenumber, but got {left} and {right}")]
    CoefficientMismatch {
        operation: &'static str,
        left: usize,
        right: usize,
    },
    #[error("specsmooth needs at least one smoothing factor")]
    EmptySmoothingFactors,
    #[error("Truncation {ntrunc} exceeds the engine maximum wavenumber {max}")]
    TruncationOutOfRange { ntrunc: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum SpharmtBuilderError {
    #[error("Unitialized field on SpharmtBuilder: {0}")]
    UninitializedFieldError(String),
    #[error("Spharmt needs nlat >= {min}, but got {nlat}")]
    TooFewLatitudes { nlat: usize, min: usize },
    #[error("Spharmt needs nlon >= {min}, but got {nlon}")]
    TooFewLongitudes { nlon: usize, min: usize },
    #[error("rsphere must be finite and > 0, but got {0}")]
    InvalidRsphere(f64),
    #[error("Unknown Legendre function mode {0:?}, expected \"stored\" or \"computed\"")]
    UnknownLegendreFunctions(String),
}
