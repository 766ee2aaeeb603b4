// xspharm/src/engine/traits.rs

use super::errors::EngineFailureError;
use super::spectral::SpectralCoefficients;
use crate::grid::GridType;
use ndarray::{Array2, ArrayView2};

/// Spherical harmonic transforms on one `(lat, lon)` grid slice.
///
/// Grids are north to south in latitude and ascending in longitude. Wind
/// components are eastward `u` and northward `v`.
pub trait TransformEngine: Send + Sync {
    fn nlat(&self) -> usize;
    fn nlon(&self) -> usize;
    /// Latitude layout the quadrature was built for.
    fn grid_type(&self) -> GridType;
    fn max_wavenumber(&self) -> usize;
    fn rsphere(&self) -> f64;

    fn grdtospec(
        &self,
        grid: ArrayView2<f64>,
        ntrunc: usize,
    ) -> Result<SpectralCoefficients, EngineFailureError>;

    fn spectogrd(&self, spec: &SpectralCoefficients) -> Result<Array2<f64>, EngineFailureError>;

    /// Vorticity and divergence coefficients of a wind field.
    fn getvrtdivspec(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
        ntrunc: usize,
    ) -> Result<(SpectralCoefficients, SpectralCoefficients), EngineFailureError>;

    /// Wind field from vorticity and divergence coefficients.
    fn getuv(
        &self,
        vrtspec: &SpectralCoefficients,
        divspec: &SpectralCoefficients,
    ) -> Result<(Array2<f64>, Array2<f64>), EngineFailureError>;

    /// Eastward and northward gradient components of a scalar.
    fn getgrad(
        &self,
        spec: &SpectralCoefficients,
    ) -> Result<(Array2<f64>, Array2<f64>), EngineFailureError>;

    /// Streamfunction and velocity potential of a wind field.
    fn getpsichi(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
        ntrunc: usize,
    ) -> Result<(Array2<f64>, Array2<f64>), EngineFailureError> {
        let (vrtspec, divspec) = self.getvrtdivspec(u, v, ntrunc)?;
        let psi = self.spectogrd(&vrtspec.inverse_laplacian(self.rsphere()))?;
        let chi = self.spectogrd(&divspec.inverse_laplacian(self.rsphere()))?;
        Ok((psi, chi))
    }

    fn truncate(&self, grid: ArrayView2<f64>, ntrunc: usize) -> Result<Array2<f64>, EngineFailureError> {
        self.spectogrd(&self.grdtospec(grid, ntrunc)?)
    }

    /// Multiplies coefficients of total wavenumber `n` by `smooth[n]`.
    fn specsmooth(&self, grid: ArrayView2<f64>, smooth: &[f64]) -> Result<Array2<f64>, EngineFailureError> {
        if smooth.is_empty() {
            return Err(EngineFailureError::EmptySmoothingFactors);
        }
        let ntrunc = smooth.len() - 1;
        let spec = self.grdtospec(grid, ntrunc)?;
        self.spectogrd(&spec.scale_by_degree(|n| smooth[n]))
    }
}
