// xspharm/src/xspharm/mod.rs

mod errors;
mod xspharm;
mod xspharm_builder;

pub use errors::{TruncationRangeError, XspharmError};
pub use xspharm::{Xspharm, DEFAULT_OMEGA};
pub use xspharm_builder::XspharmBuilder;
