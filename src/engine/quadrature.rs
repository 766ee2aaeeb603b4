// xspharm/src/engine/quadrature.rs

use crate::grid::{gauss_legendre, GridType};
use ndarray::Array2;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Trigonometric interpolation from an equally spaced pole-to-pole grid onto
/// the Gauss nodes.
///
/// A Fourier profile of zonal wavenumber `m` is even in colatitude across the
/// poles when `m` is even and odd otherwise; the wind components carry the
/// opposite parity. Even profiles are expanded in `cos(k theta)` and odd
/// profiles in `sin(k theta)` over the doubled circle.
struct Interpolation {
    even: Array2<f64>,
    odd: Array2<f64>,
}

impl Interpolation {
    fn new(grid_colatitudes: &[f64], quadrature_colatitudes: &[f64]) -> Self {
        let nlat = grid_colatitudes.len();
        let ntheta = nlat - 1;
        let nq = quadrature_colatitudes.len();
        let half = |k: usize| if k == 0 || k == ntheta { 0.5 } else { 1.0 };
        let scale = 2.0 / ntheta as f64;
        let mut even = Array2::zeros((nq, nlat));
        let mut odd = Array2::zeros((nq, nlat));
        for (q, &tq) in quadrature_colatitudes.iter().enumerate() {
            for (j, &tj) in grid_colatitudes.iter().enumerate() {
                let e: f64 = (0..=ntheta)
                    .map(|k| half(k) * (k as f64 * tj).cos() * (k as f64 * tq).cos())
                    .sum();
                even[[q, j]] = scale * half(j) * e;
                if j != 0 && j != ntheta {
                    let o: f64 = (1..ntheta)
                        .map(|k| (k as f64 * tj).sin() * (k as f64 * tq).sin())
                        .sum();
                    odd[[q, j]] = scale * o;
                }
            }
        }
        Self { even, odd }
    }
}

/// Gauss-Legendre analysis quadrature for a grid.
pub struct AnalysisQuadrature {
    colatitudes: Vec<f64>,
    weights: Vec<f64>,
    interpolation: Option<Interpolation>,
}

impl AnalysisQuadrature {
    pub fn new(grid_type: GridType, nlat: usize) -> Self {
        let (nodes, weights) = gauss_legendre(nlat);
        let colatitudes: Vec<f64> = nodes.iter().map(|x| x.acos()).collect();
        let interpolation = match grid_type {
            GridType::Gaussian => None,
            GridType::Regular => {
                let grid = regular_colatitudes(nlat);
                Some(Interpolation::new(&grid, &colatitudes))
            }
        };
        Self {
            colatitudes,
            weights,
            interpolation,
        }
    }

    pub fn colatitudes(&self) -> &[f64] {
        &self.colatitudes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Maps Fourier profiles `(nlat, m)` on the grid latitudes onto the
    /// quadrature nodes. Gaussian grids already sit on the nodes.
    pub fn onto_nodes(&self, profiles: Array2<Complex64>, vector: bool) -> Array2<Complex64> {
        let interpolation = match &self.interpolation {
            Some(interpolation) => interpolation,
            None => return profiles,
        };
        let (nlat, mcount) = profiles.dim();
        let mut out = Array2::zeros((self.colatitudes.len(), mcount));
        for m in 0..mcount {
            let odd = (m % 2 == 1) != vector;
            let matrix = if odd {
                &interpolation.odd
            } else {
                &interpolation.even
            };
            for q in 0..self.colatitudes.len() {
                let mut total = Complex64::new(0.0, 0.0);
                for j in 0..nlat {
                    total += profiles[[j, m]] * matrix[[q, j]];
                }
                out[[q, m]] = total;
            }
        }
        out
    }
}

/// Grid colatitudes in radians, north to south.
pub fn grid_colatitudes(grid_type: GridType, nlat: usize) -> Vec<f64> {
    match grid_type {
        GridType::Gaussian => {
            let (nodes, _) = gauss_legendre(nlat);
            nodes.iter().map(|x| x.acos()).collect()
        }
        GridType::Regular => regular_colatitudes(nlat),
    }
}

fn regular_colatitudes(nlat: usize) -> Vec<f64> {
    let ntheta = (nlat - 1) as f64;
    (0..nlat).map(|j| PI * j as f64 / ntheta).collect()
}
