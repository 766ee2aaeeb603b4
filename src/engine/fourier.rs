// xspharm/src/engine/fourier.rs

use ndarray::{ArrayView1, ArrayViewMut1};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Direct discrete Fourier transform along a latitude circle.
///
/// Longitudes are `2 pi k / nlon`, measured from the first grid column.
pub struct FourierTable {
    nlon: usize,
    cos: Vec<f64>,
    sin: Vec<f64>,
}

impl FourierTable {
    pub fn new(nlon: usize) -> Self {
        let (sin, cos): (Vec<f64>, Vec<f64>) = (0..nlon)
            .map(|k| (2.0 * PI * k as f64 / nlon as f64).sin_cos())
            .unzip();
        Self { nlon, cos, sin }
    }

    pub fn nlon(&self) -> usize {
        self.nlon
    }

    /// `F_m = (1 / nlon) sum_k f_k exp(-i m lambda_k)` for `m = 0..=mmax`.
    pub fn analyse(&self, row: ArrayView1<f64>, mmax: usize) -> Vec<Complex64> {
        let scale = 1.0 / self.nlon as f64;
        (0..=mmax)
            .map(|m| {
                let mut re = 0.0;
                let mut im = 0.0;
                for (k, value) in row.iter().enumerate() {
                    let phase = (m * k) % self.nlon;
                    re += value * self.cos[phase];
                    im -= value * self.sin[phase];
                }
                Complex64::new(re * scale, im * scale)
            })
            .collect()
    }

    /// Inverse of [`FourierTable::analyse`] for a real signal.
    pub fn synthesise(&self, coeffs: &[Complex64], mut row: ArrayViewMut1<f64>) {
        for (k, value) in row.iter_mut().enumerate() {
            let mut total = coeffs.first().map(|c| c.re).unwrap_or(0.0);
            for (m, c) in coeffs.iter().enumerate().skip(1) {
                let phase = (m * k) % self.nlon;
                total += 2.0 * (c.re * self.cos[phase] - c.im * self.sin[phase]);
            }
            *value = total;
        }
    }
}
