// xspharm/src/labeled/mod.rs

mod dataset;
mod errors;
mod field;

pub use dataset::{Dataset, FieldOrDataset, Labeled};
pub use errors::LabeledFieldError;
pub use field::LabeledField;
