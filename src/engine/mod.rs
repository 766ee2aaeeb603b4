// xspharm/src/engine/mod.rs

mod errors;
mod fourier;
mod legendre;
mod quadrature;
mod spectral;
mod spharmt;
mod traits;

pub use errors::{EngineFailureError, SpharmtBuilderError};
pub use fourier::FourierTable;
pub use legendre::{LegendreColumn, LegendreFunctions, LegendreTable};
pub use quadrature::{grid_colatitudes, AnalysisQuadrature};
pub use spectral::{nmdim, spectral_index, SpectralCoefficients};
pub use spharmt::{Spharmt, SpharmtBuilder, DEFAULT_RSPHERE};
pub use traits::TransformEngine;
