// xspharm/src/engine/spharmt.rs

use super::errors::{EngineFailureError, SpharmtBuilderError};
use super::fourier::FourierTable;
use super::legendre::{LegendreFunctions, LegendreTable};
use super::quadrature::{grid_colatitudes, AnalysisQuadrature};
use super::spectral::{spectral_index, SpectralCoefficients};
use super::traits::TransformEngine;
use crate::grid::{max_wavenumber, GridType, MIN_NLAT, MIN_NLON};
use humantime::format_duration;
use log::{debug, info, trace};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use std::time::Instant;

pub const DEFAULT_RSPHERE: f64 = 6.3712e6;

/// Reference spherical harmonic transform engine.
///
/// Analysis integrates with Gauss-Legendre quadrature; regular grids are first
/// interpolated onto the Gauss nodes. Synthesis evaluates the Legendre
/// functions on the grid latitudes directly.
pub struct Spharmt {
    nlat: usize,
    nlon: usize,
    grid_type: GridType,
    rsphere: f64,
    nmax: usize,
    legfunc: LegendreFunctions,
    fourier: FourierTable,
    quadrature: AnalysisQuadrature,
    grid_legendre: LegendreTable,
    node_legendre: Option<LegendreTable>,
}

impl Spharmt {
    pub fn legfunc(&self) -> LegendreFunctions {
        self.legfunc
    }

    fn node_legendre(&self) -> &LegendreTable {
        self.node_legendre.as_ref().unwrap_or(&self.grid_legendre)
    }

    fn check_grid(&self, operation: &'static str, grid: &ArrayView2<f64>) -> Result<(), EngineFailureError> {
        let (nlat, nlon) = grid.dim();
        if nlat != self.nlat || nlon != self.nlon {
            return Err(EngineFailureError::ShapeMismatch {
                operation,
                expected_nlat: self.nlat,
                expected_nlon: self.nlon,
                nlat,
                nlon,
            });
        }
        if !grid.iter().all(|value| value.is_finite()) {
            return Err(EngineFailureError::NonFiniteInput(operation));
        }
        Ok(())
    }

    fn check_ntrunc(&self, ntrunc: usize) -> Result<(), EngineFailureError> {
        if ntrunc > self.nmax {
            return Err(EngineFailureError::TruncationOutOfRange {
                ntrunc,
                max: self.nmax,
            });
        }
        Ok(())
    }

    fn check_output(operation: &'static str, grid: &Array2<f64>) -> Result<(), EngineFailureError> {
        if !grid.iter().all(|value| value.is_finite()) {
            return Err(EngineFailureError::NonFiniteOutput(operation));
        }
        Ok(())
    }

    /// Fourier profiles of every latitude row, moved onto the quadrature nodes.
    fn node_profiles(&self, grid: ArrayView2<f64>, mmax: usize, vector: bool) -> Array2<Complex64> {
        let mut profiles = Array2::zeros((self.nlat, mmax + 1));
        for (j, row) in grid.outer_iter().enumerate() {
            for (m, value) in self.fourier.analyse(row, mmax).into_iter().enumerate() {
                profiles[[j, m]] = value;
            }
        }
        self.quadrature.onto_nodes(profiles, vector)
    }

    /// Winds from streamfunction and velocity potential coefficients.
    fn vector_synthesis(
        &self,
        psi: &SpectralCoefficients,
        chi: &SpectralCoefficients,
    ) -> Result<(Array2<f64>, Array2<f64>), EngineFailureError> {
        let ntrunc = psi.ntrunc();
        let i = Complex64::i();
        let inv_a = 1.0 / self.rsphere;
        let mut u = Array2::zeros((self.nlat, self.nlon));
        let mut v = Array2::zeros((self.nlat, self.nlon));
        let mut fu = vec![Complex64::new(0.0, 0.0); ntrunc + 1];
        let mut fv = vec![Complex64::new(0.0, 0.0); ntrunc + 1];
        for j in 0..self.nlat {
            let column = self.grid_legendre.column(j);
            for m in 0..=ntrunc {
                let mut um = Complex64::new(0.0, 0.0);
                let mut vm = Complex64::new(0.0, 0.0);
                for n in m..=ntrunc {
                    let k = spectral_index(self.nmax, m, n);
                    let (p, c) = (psi.get(m, n), chi.get(m, n));
                    um += p * column.dp[k] + i * c * column.mp[k];
                    vm += i * p * column.mp[k] - c * column.dp[k];
                }
                fu[m] = um * inv_a;
                fv[m] = vm * inv_a;
            }
            self.fourier.synthesise(&fu, u.row_mut(j));
            self.fourier.synthesise(&fv, v.row_mut(j));
        }
        Self::check_output("vector synthesis", &u)?;
        Self::check_output("vector synthesis", &v)?;
        Ok((u, v))
    }
}

impl TransformEngine for Spharmt {
    fn nlat(&self) -> usize {
        self.nlat
    }

    fn nlon(&self) -> usize {
        self.nlon
    }

    fn grid_type(&self) -> GridType {
        self.grid_type
    }

    fn max_wavenumber(&self) -> usize {
        self.nmax
    }

    fn rsphere(&self) -> f64 {
        self.rsphere
    }

    fn grdtospec(
        &self,
        grid: ArrayView2<f64>,
        ntrunc: usize,
    ) -> Result<SpectralCoefficients, EngineFailureError> {
        self.check_grid("grdtospec", &grid)?;
        self.check_ntrunc(ntrunc)?;
        let profiles = self.node_profiles(grid, ntrunc, false);
        let table = self.node_legendre();
        let mut spec = SpectralCoefficients::zeros(ntrunc);
        for (q, weight) in self.quadrature.weights().iter().enumerate() {
            let column = table.column(q);
            for m in 0..=ntrunc {
                let f = profiles[[q, m]] * *weight;
                for n in m..=ntrunc {
                    let index = spec.index(m, n);
                    spec.as_mut_slice()[index] += f * column.p[spectral_index(self.nmax, m, n)];
                }
            }
        }
        if !spec.is_finite() {
            return Err(EngineFailureError::NonFiniteOutput("grdtospec"));
        }
        trace!("grdtospec: analysed {}x{} grid at T{}", self.nlat, self.nlon, ntrunc);
        Ok(spec)
    }

    fn spectogrd(&self, spec: &SpectralCoefficients) -> Result<Array2<f64>, EngineFailureError> {
        let ntrunc = spec.ntrunc();
        self.check_ntrunc(ntrunc)?;
        if !spec.is_finite() {
            return Err(EngineFailureError::NonFiniteInput("spectogrd"));
        }
        let mut grid = Array2::zeros((self.nlat, self.nlon));
        let mut fourier = vec![Complex64::new(0.0, 0.0); ntrunc + 1];
        for j in 0..self.nlat {
            let column = self.grid_legendre.column(j);
            for (m, slot) in fourier.iter_mut().enumerate() {
                *slot = (m..=ntrunc)
                    .map(|n| spec.get(m, n) * column.p[spectral_index(self.nmax, m, n)])
                    .sum();
            }
            self.fourier.synthesise(&fourier, grid.row_mut(j));
        }
        Self::check_output("spectogrd", &grid)?;
        Ok(grid)
    }

    fn getvrtdivspec(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
        ntrunc: usize,
    ) -> Result<(SpectralCoefficients, SpectralCoefficients), EngineFailureError> {
        self.check_grid("getvrtdivspec", &u)?;
        self.check_grid("getvrtdivspec", &v)?;
        self.check_ntrunc(ntrunc)?;
        let fu = self.node_profiles(u, ntrunc, true);
        let fv = self.node_profiles(v, ntrunc, true);
        let table = self.node_legendre();
        let i = Complex64::i();
        let inv_a = 1.0 / self.rsphere;
        let mut vrt = SpectralCoefficients::zeros(ntrunc);
        let mut div = SpectralCoefficients::zeros(ntrunc);
        for (q, weight) in self.quadrature.weights().iter().enumerate() {
            let column = table.column(q);
            for m in 0..=ntrunc {
                let um = fu[[q, m]] * (*weight * inv_a);
                let vm = fv[[q, m]] * (*weight * inv_a);
                for n in m..=ntrunc {
                    let k = spectral_index(self.nmax, m, n);
                    let index = vrt.index(m, n);
                    vrt.as_mut_slice()[index] += i * vm * column.mp[k] - um * column.dp[k];
                    div.as_mut_slice()[index] += i * um * column.mp[k] + vm * column.dp[k];
                }
            }
        }
        if !vrt.is_finite() || !div.is_finite() {
            return Err(EngineFailureError::NonFiniteOutput("getvrtdivspec"));
        }
        Ok((vrt, div))
    }

    fn getuv(
        &self,
        vrtspec: &SpectralCoefficients,
        divspec: &SpectralCoefficients,
    ) -> Result<(Array2<f64>, Array2<f64>), EngineFailureError> {
        if vrtspec.ntrunc() != divspec.ntrunc() {
            return Err(EngineFailureError::CoefficientMismatch {
                operation: "getuv",
                left: vrtspec.ntrunc(),
                right: divspec.ntrunc(),
            });
        }
        self.check_ntrunc(vrtspec.ntrunc())?;
        let psi = vrtspec.inverse_laplacian(self.rsphere);
        let chi = divspec.inverse_laplacian(self.rsphere);
        self.vector_synthesis(&psi, &chi)
    }

    fn getgrad(
        &self,
        spec: &SpectralCoefficients,
    ) -> Result<(Array2<f64>, Array2<f64>), EngineFailureError> {
        self.check_ntrunc(spec.ntrunc())?;
        let zeros = SpectralCoefficients::zeros(spec.ntrunc());
        self.vector_synthesis(&zeros, spec)
    }
}

#[derive(Default)]
pub struct SpharmtBuilder<'a> {
    nlon: Option<&'a usize>,
    nlat: Option<&'a usize>,
    gridtype: Option<&'a GridType>,
    rsphere: Option<&'a f64>,
    legfunc: Option<&'a LegendreFunctions>,
}

impl<'a> SpharmtBuilder<'a> {
    pub fn build(&self) -> Result<Spharmt, SpharmtBuilderError> {
        let nlon = *self
            .nlon
            .ok_or_else(|| SpharmtBuilderError::UninitializedFieldError("nlon".to_string()))?;
        let nlat = *self
            .nlat
            .ok_or_else(|| SpharmtBuilderError::UninitializedFieldError("nlat".to_string()))?;
        let grid_type = self.gridtype.copied().unwrap_or_default();
        let rsphere = self.rsphere.copied().unwrap_or(DEFAULT_RSPHERE);
        let legfunc = self.legfunc.copied().unwrap_or_default();
        Self::validate_nlat(&nlat)?;
        Self::validate_nlon(&nlon)?;
        Self::validate_rsphere(&rsphere)?;

        let start = Instant::now();
        let nmax = max_wavenumber(grid_type, nlat, nlon);
        info!(
            "Building {} Spharmt for {}x{} grid (T{}, {} Legendre functions)",
            grid_type, nlat, nlon, nmax, legfunc
        );
        let fourier = FourierTable::new(nlon);
        let quadrature = AnalysisQuadrature::new(grid_type, nlat);
        let grid_legendre = LegendreTable::new(grid_colatitudes(grid_type, nlat), nmax, legfunc);
        let node_legendre = match grid_type {
            GridType::Gaussian => None,
            GridType::Regular => Some(LegendreTable::new(
                quadrature.colatitudes().to_vec(),
                nmax,
                legfunc,
            )),
        };
        debug!("Spharmt tables built in {}", format_duration(start.elapsed()));
        Ok(Spharmt {
            nlat,
            nlon,
            grid_type,
            rsphere,
            nmax,
            legfunc,
            fourier,
            quadrature,
            grid_legendre,
            node_legendre,
        })
    }

    fn validate_nlat(nlat: &usize) -> Result<(), SpharmtBuilderError> {
        if *nlat < MIN_NLAT {
            return Err(SpharmtBuilderError::TooFewLatitudes {
                nlat: *nlat,
                min: MIN_NLAT,
            });
        }
        Ok(())
    }

    fn validate_nlon(nlon: &usize) -> Result<(), SpharmtBuilderError> {
        if *nlon < MIN_NLON {
            return Err(SpharmtBuilderError::TooFewLongitudes {
                nlon: *nlon,
                min: MIN_NLON,
            });
        }
        Ok(())
    }

    fn validate_rsphere(rsphere: &f64) -> Result<(), SpharmtBuilderError> {
        if !rsphere.is_finite() || *rsphere <= 0.0 {
            return Err(SpharmtBuilderError::InvalidRsphere(*rsphere));
        }
        Ok(())
    }

    pub fn nlon(&mut self, nlon: &'a usize) -> &mut Self {
        self.nlon = Some(nlon);
        self
    }

    pub fn nlat(&mut self, nlat: &'a usize) -> &mut Self {
        self.nlat = Some(nlat);
        self
    }

    pub fn gridtype(&mut self, gridtype: &'a GridType) -> &mut Self {
        self.gridtype = Some(gridtype);
        self
    }

    pub fn rsphere(&mut self, rsphere: &'a f64) -> &mut Self {
        self.rsphere = Some(rsphere);
        self
    }

    pub fn legfunc(&mut self, legfunc: &'a LegendreFunctions) -> &mut Self {
        self.legfunc = Some(legfunc);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;

    const RSPHERE: f64 = 6.3712e6;

    fn engine(grid_type: GridType, nlat: usize, nlon: usize, legfunc: LegendreFunctions) -> Spharmt {
        SpharmtBuilder::default()
            .nlat(&nlat)
            .nlon(&nlon)
            .gridtype(&grid_type)
            .legfunc(&legfunc)
            .build()
            .unwrap()
    }

    /// Evaluates `f(lat, lon)` in radians on the engine grid.
    fn sample<F: Fn(f64, f64) -> f64>(grid_type: GridType, nlat: usize, nlon: usize, f: F) -> Array2<f64> {
        let colatitudes = grid_colatitudes(grid_type, nlat);
        Array2::from_shape_fn((nlat, nlon), |(j, k)| {
            let lat = PI / 2.0 - colatitudes[j];
            let lon = 2.0 * PI * k as f64 / nlon as f64;
            f(lat, lon)
        })
    }

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_scalar_roundtrip_both_grids() {
        for grid_type in [GridType::Regular, GridType::Gaussian] {
            let sh = engine(grid_type, 9, 16, LegendreFunctions::Stored);
            let field = sample(grid_type, 9, 16, |lat, lon| {
                1.0 + lat.sin() + lat.cos() * lon.cos() + lat.cos().powi(2) * (2.0 * lon).sin()
                    + lat.sin() * lat.cos().powi(3) * (3.0 * lon).cos()
            });
            let spec = sh.grdtospec(field.view(), sh.max_wavenumber()).unwrap();
            let back = sh.spectogrd(&spec).unwrap();
            assert!(max_abs_diff(&field, &back) < 1e-12, "{:?}", grid_type);
        }
    }

    #[test]
    fn test_constant_field_maps_to_mean_coefficient() {
        let sh = engine(GridType::Regular, 7, 12, LegendreFunctions::Computed);
        let field = Array2::from_elem((7, 12), 3.0);
        let spec = sh.grdtospec(field.view(), 2).unwrap();
        assert!((spec.get(0, 0).re - 3.0 * 2f64.sqrt()).abs() < 1e-12);
        for (m, n, value) in spec.iter() {
            if (m, n) != (0, 0) {
                assert!(value.norm() < 1e-12);
            }
        }
    }

    #[test]
    fn test_vorticity_of_rossby_haurwitz_streamfunction() {
        for grid_type in [GridType::Regular, GridType::Gaussian] {
            let (nlat, nlon) = (9, 16);
            let sh = engine(grid_type, nlat, nlon, LegendreFunctions::Stored);
            let amp = 1.0e7;
            // psi = A cos(lat) sin(lat) cos(lon), a degree two harmonic
            let psi = sample(grid_type, nlat, nlon, |lat, lon| amp * lat.cos() * lat.sin() * lon.cos());
            let u = sample(grid_type, nlat, nlon, |lat, lon| -amp / RSPHERE * (2.0 * lat).cos() * lon.cos());
            let v = sample(grid_type, nlat, nlon, |lat, lon| -amp / RSPHERE * lat.sin() * lon.sin());
            let (vrt, div) = sh.getvrtdivspec(u.view(), v.view(), sh.max_wavenumber()).unwrap();
            let vrt_grid = sh.spectogrd(&vrt).unwrap();
            let div_grid = sh.spectogrd(&div).unwrap();
            let expected = psi.mapv(|value| -6.0 * value / (RSPHERE * RSPHERE));
            let scale = amp / (RSPHERE * RSPHERE);
            assert!(max_abs_diff(&vrt_grid, &expected) < 1e-10 * scale, "{:?}", grid_type);
            assert!(div_grid.iter().all(|value| value.abs() < 1e-10 * scale));

            let (u_back, v_back) = sh.getuv(&vrt, &div).unwrap();
            assert!(max_abs_diff(&u, &u_back) < 1e-12);
            assert!(max_abs_diff(&v, &v_back) < 1e-12);

            let (psi_back, chi_back) = sh.getpsichi(u.view(), v.view(), sh.max_wavenumber()).unwrap();
            assert!(max_abs_diff(&psi, &psi_back) < 1e-6);
            assert!(chi_back.iter().all(|value| value.abs() < 1e-6));
        }
    }

    #[test]
    fn test_divergent_meridional_wind() {
        let (nlat, nlon) = (9, 16);
        let sh = engine(GridType::Regular, nlat, nlon, LegendreFunctions::Stored);
        let v0 = 10.0;
        let u = Array2::zeros((nlat, nlon));
        let v = sample(GridType::Regular, nlat, nlon, |lat, _| v0 * lat.cos());
        let (vrt, div) = sh.getvrtdivspec(u.view(), v.view(), sh.max_wavenumber()).unwrap();
        let div_grid = sh.spectogrd(&div).unwrap();
        let expected = sample(GridType::Regular, nlat, nlon, |lat, _| -2.0 * v0 * lat.sin() / RSPHERE);
        assert!(max_abs_diff(&div_grid, &expected) < 1e-18);
        assert!(vrt.as_slice().iter().all(|value| value.norm() < 1e-18));
    }

    #[test]
    fn test_gradient_of_sin_latitude() {
        let (nlat, nlon) = (8, 16);
        let sh = engine(GridType::Gaussian, nlat, nlon, LegendreFunctions::Stored);
        let chi = sample(GridType::Gaussian, nlat, nlon, |lat, _| RSPHERE * lat.sin());
        let spec = sh.grdtospec(chi.view(), sh.max_wavenumber()).unwrap();
        let (ug, vg) = sh.getgrad(&spec).unwrap();
        let expected = sample(GridType::Gaussian, nlat, nlon, |lat, _| lat.cos());
        assert!(ug.iter().all(|value| value.abs() < 1e-12));
        assert!(max_abs_diff(&vg, &expected) < 1e-12);
    }

    #[test]
    fn test_truncate_and_specsmooth() {
        let sh = engine(GridType::Gaussian, 8, 16, LegendreFunctions::Stored);
        let field = sample(GridType::Gaussian, 8, 16, |lat, lon| 2.0 + lat.cos() * lon.cos() + (3.0 * lat).sin());
        let low = sh.truncate(field.view(), 1).unwrap();
        let spec = sh.grdtospec(low.view(), sh.max_wavenumber()).unwrap();
        for (_, n, value) in spec.iter() {
            if n > 1 {
                assert!(value.norm() < 1e-12);
            }
        }
        let smoothed = sh.specsmooth(field.view(), &[1.0, 0.0]).unwrap();
        assert!(smoothed.iter().all(|value| (value - smoothed[[0, 0]]).abs() < 1e-12));
        assert!(matches!(
            sh.specsmooth(field.view(), &[]),
            Err(EngineFailureError::EmptySmoothingFactors)
        ));
    }

    #[test]
    fn test_rejects_bad_input() {
        let sh = engine(GridType::Regular, 5, 8, LegendreFunctions::Stored);
        let wrong = Array2::zeros((4, 8));
        assert!(matches!(
            sh.grdtospec(wrong.view(), 1),
            Err(EngineFailureError::ShapeMismatch { nlat: 4, .. })
        ));
        let mut bad = Array2::zeros((5, 8));
        bad[[2, 3]] = f64::NAN;
        assert!(matches!(
            sh.grdtospec(bad.view(), 1),
            Err(EngineFailureError::NonFiniteInput(_))
        ));
        let ok = Array2::zeros((5, 8));
        assert!(matches!(
            sh.grdtospec(ok.view(), sh.max_wavenumber() + 1),
            Err(EngineFailureError::TruncationOutOfRange { .. })
        ));
        assert!(matches!(
            SpharmtBuilder::default().nlat(&5).build(),
            Err(SpharmtBuilderError::UninitializedFieldError(_))
        ));
    }
}
