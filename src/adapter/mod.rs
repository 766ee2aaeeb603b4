// xspharm/src/adapter/mod.rs

mod errors;
mod grid_adapter;

pub use errors::DimensionMismatchError;
pub use grid_adapter::{
    FlattenDescriptor, GridAdapter, GridAdapterBuilder, DEFAULT_LAT_DIM, DEFAULT_LON_DIM,
};
