// xspharm/src/grid/mod.rs

mod errors;
mod gaussian;
mod grid_spec;

pub use errors::InvalidGridError;
pub use gaussian::{gauss_legendre, gaussian_latitudes, regular_latitudes};
pub use grid_spec::{
    max_wavenumber, GridSpec, GridSpecBuilder, GridType, LatitudeOrder, LongitudeOrder,
    DEFAULT_COORD_TOLERANCE, MIN_NLAT, MIN_NLON,
};
