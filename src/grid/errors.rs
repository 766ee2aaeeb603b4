// xspharm/src/grid/errors.rs

use ndarray_stats::errors::MinMaxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvalidGridError {
    #[error("Unitialized field on grid builder: {0}")]
    UninitializedFieldError(String),
    #[error("Unknown grid type {0:?}, expected \"regular\" or \"gaussian\"")]
    UnknownGridType(String),
    #[error("Latitude and longitude dimensions must differ, but both are {0:?}")]
    IdenticalSpatialDims(String),
    #[error("Reference grid has no dimension named {0:?}")]
    MissingDimension(String),
    #[error("Dimension {0:?} has no coordinate values in the reference grid")]
    MissingCoordinate(String),
    #[error("Dimension {0:?} needs at least {1} points, but got {2}")]
    TooFewPoints(String, usize, usize),
    #[error("Coordinate {0:?} contains non-finite values")]
    NonFiniteCoordinate(String),
    #[error("Coordinate {0:?} must be strictly monotonic")]
    NonMonotonic(String),
    #[error("Latitudes must lie in [-90, 90], but got range [{0}, {1}]")]
    LatitudeOutOfRange(f64, f64),
    #[error("Longitudes must be global and equally spaced by {expected} degrees, but step {index} is {actual}")]
    IrregularLongitudes {
        index: usize,
        expected: f64,
        actual: f64,
    },
    #[error("Regular grid latitude {index} should be {expected} (equally spaced, pole to pole), but got {actual}")]
    RegularLatitudeMismatch {
        index: usize,
        expected: f64,
        actual: f64,
    },
    #[error("Gaussian grid latitude {index} should be {expected}, but got {actual}")]
    GaussianLatitudeMismatch {
        index: usize,
        expected: f64,
        actual: f64,
    },
    #[error("Coordinate tolerance must be finite and > 0, but got {0}")]
    InvalidTolerance(f64),
    #[error(transparent)]
    MinMaxError(#[from] MinMaxError),
}
