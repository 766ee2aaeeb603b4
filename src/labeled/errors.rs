// xspharm/src/labeled/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabeledFieldError {
    #[error("Field {name:?} names {ndims} dimensions for an array of rank {ndim}")]
    RankMismatch {
        name: String,
        ndims: usize,
        ndim: usize,
    },
    #[error("Dimension {0:?} appears more than once")]
    DuplicateDimension(String),
    #[error("Field {0:?} has no dimension {1:?}")]
    UnknownDimension(String, String),
    #[error("Coordinate {dim:?} has {actual} values, but the dimension has length {expected}")]
    CoordinateLength {
        dim: String,
        expected: usize,
        actual: usize,
    },
}
