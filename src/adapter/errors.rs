// xspharm/src/adapter/errors.rs

use ndarray::ShapeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DimensionMismatchError {
    #[error("Field {field:?} has no spatial dimension {dim:?} (dims: {dims:?})")]
    MissingSpatialDimension {
        field: String,
        dim: String,
        dims: Vec<String>,
    },
    #[error("Field {field:?} dimension {dim:?} has length {actual}, but the grid has {expected}")]
    ExtentMismatch {
        field: String,
        dim: String,
        expected: usize,
        actual: usize,
    },
    #[error("Field {field:?} coordinate {dim:?} differs from the grid at index {index}: expected {expected}, got {actual}")]
    CoordinateMismatch {
        field: String,
        dim: String,
        index: usize,
        expected: f64,
        actual: f64,
    },
    #[error("Fields {left:?} and {right:?} must have identical dimensions and shapes, but got {left_dims:?} {left_shape:?} and {right_dims:?} {right_shape:?}")]
    ComponentMismatch {
        left: String,
        right: String,
        left_dims: Vec<String>,
        right_dims: Vec<String>,
        left_shape: Vec<usize>,
        right_shape: Vec<usize>,
    },
    #[error("Engine output of shape {actual:?} does not fit {field:?}, which expects {expected:?}")]
    RawShapeMismatch {
        field: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
