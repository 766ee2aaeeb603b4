// xspharm/src/engine/spectral.rs

use num_complex::Complex64;

/// Number of coefficients in a triangular truncation at `ntrunc`.
pub fn nmdim(ntrunc: usize) -> usize {
    (ntrunc + 1) * (ntrunc + 2) / 2
}

/// Position of `(m, n)` in the zonal-wavenumber-major triangular layout.
///
/// Requires `m <= n <= ntrunc`; other pairs have no slot and panic in debug
/// builds.
pub fn spectral_index(ntrunc: usize, m: usize, n: usize) -> usize {
    debug_assert!(
        m <= n && n <= ntrunc,
        "no triangular slot for (m, n) = ({}, {}) at T{}",
        m,
        n,
        ntrunc
    );
    m * (ntrunc + 1) - m * m.saturating_sub(1) / 2 + (n - m)
}

/// Complex spherical harmonic coefficients `a_n^m`, `0 <= m <= n <= ntrunc`.
///
/// Only non-negative `m` are stored; the grid fields are real so the negative
/// orders are implied by conjugate symmetry.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralCoefficients {
    ntrunc: usize,
    data: Vec<Complex64>,
}

impl SpectralCoefficients {
    pub fn zeros(ntrunc: usize) -> Self {
        Self {
            ntrunc,
            data: vec![Complex64::new(0.0, 0.0); nmdim(ntrunc)],
        }
    }

    pub fn ntrunc(&self) -> usize {
        self.ntrunc
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn index(&self, m: usize, n: usize) -> usize {
        spectral_index(self.ntrunc, m, n)
    }

    /// Coefficient `a_n^m`. Panics unless `m <= n <= ntrunc`.
    pub fn get(&self, m: usize, n: usize) -> Complex64 {
        self.data[self.index(m, n)]
    }

    /// Panics unless `m <= n <= ntrunc`.
    pub fn set(&mut self, m: usize, n: usize, value: Complex64) {
        let index = self.index(m, n);
        self.data[index] = value;
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    /// Iterates `(m, n, coefficient)` in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Complex64)> + '_ {
        let ntrunc = self.ntrunc;
        (0..=ntrunc)
            .flat_map(move |m| (m..=ntrunc).map(move |n| (m, n)))
            .zip(self.data.iter())
            .map(|((m, n), value)| (m, n, *value))
    }

    /// Multiplies every coefficient by a factor depending on its total wavenumber.
    pub fn scale_by_degree<F>(&self, factor: F) -> Self
    where
        F: Fn(usize) -> f64,
    {
        let factors: Vec<f64> = (0..=self.ntrunc).map(factor).collect();
        let data = self
            .iter()
            .map(|(_, n, value)| value * factors[n])
            .collect();
        Self {
            ntrunc: self.ntrunc,
            data,
        }
    }

    /// Applies `a^2 / (n (n + 1))` with a sign flip; the `n = 0` mode maps to zero.
    pub fn inverse_laplacian(&self, rsphere: f64) -> Self {
        let a2 = rsphere * rsphere;
        self.scale_by_degree(|n| {
            if n == 0 {
                0.0
            } else {
                -a2 / (n * (n + 1)) as f64
            }
        })
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.re.is_finite() && value.im.is_finite())
    }
}
