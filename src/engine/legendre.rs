// xspharm/src/engine/legendre.rs

use super::errors::SpharmtBuilderError;
use super::spectral::{nmdim, spectral_index};
use log::debug;
use std::borrow::Cow;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

/// How the engine obtains associated Legendre functions.
///
/// `Stored` keeps three `f64` per coefficient for every latitude north of and
/// on the equator, about `nlat / 2 * (N + 1) * (N + 2) * 12` bytes per table.
/// A regular grid holds two tables. Use `Computed` for grids near 0.25 degree
/// or finer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LegendreFunctions {
    /// Precomputed once at construction.
    #[default]
    Stored,
    /// Recomputed for every latitude on every transform.
    Computed,
}

impl FromStr for LegendreFunctions {
    type Err = SpharmtBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stored" => Ok(LegendreFunctions::Stored),
            "computed" => Ok(LegendreFunctions::Computed),
            _ => Err(SpharmtBuilderError::UnknownLegendreFunctions(s.to_string())),
        }
    }
}

impl fmt::Display for LegendreFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegendreFunctions::Stored => write!(f, "stored"),
            LegendreFunctions::Computed => write!(f, "computed"),
        }
    }
}

/// Orthonormal associated Legendre functions at one colatitude.
///
/// `p` holds `P_n^m(cos theta)` normalised so that the integral of its square
/// over `[-1, 1]` is one, without the Condon-Shortley phase. `dp` holds the
/// colatitude derivative and `mp` holds `m P_n^m / sin(theta)`, which stays
/// finite at the poles. All three use the triangular layout at `nmax`.
#[derive(Clone, Debug)]
pub struct LegendreColumn {
    pub p: Vec<f64>,
    pub dp: Vec<f64>,
    pub mp: Vec<f64>,
}

impl LegendreColumn {
    pub fn compute(colatitude: f64, nmax: usize) -> Self {
        let (sin_theta, x) = colatitude.sin_cos();
        let len = nmdim(nmax);
        let mut p = vec![0.0; len];
        let mut dp = vec![0.0; len];
        let mut mp = vec![0.0; len];

        let mut pmm = std::f64::consts::FRAC_1_SQRT_2;
        let mut order_one = Vec::new();
        for m in 0..=nmax {
            let mut qmm = 0.0;
            if m > 0 {
                let k = ((2 * m + 1) as f64 / (2 * m) as f64).sqrt();
                qmm = k * pmm;
                pmm *= k * sin_theta;
            }
            let p_m = recur_in_degree(m, nmax + 1, x, pmm);
            if m > 0 {
                // q = p / sin(theta) obeys the same recurrence in n
                let q_m = recur_in_degree(m, nmax + 1, x, qmm);
                for n in m..=nmax {
                    let index = spectral_index(nmax, m, n);
                    let upper = n as f64 * epsilon(n + 1, m) * q_m[n + 1 - m];
                    let lower = if n > m {
                        (n + 1) as f64 * epsilon(n, m) * q_m[n - 1 - m]
                    } else {
                        0.0
                    };
                    mp[index] = m as f64 * q_m[n - m];
                    dp[index] = upper - lower;
                }
            }
            for n in m..=nmax {
                p[spectral_index(nmax, m, n)] = p_m[n - m];
            }
            if m == 1 {
                order_one = p_m;
            }
        }
        for n in 1..=nmax {
            dp[spectral_index(nmax, 0, n)] = -((n * (n + 1)) as f64).sqrt() * order_one[n - 1];
        }
        Self { p, dp, mp }
    }

    /// Values at `pi - theta` from the values at `theta`, using the parity
    /// `(-1)^(n + m)` of `P_n^m` about the equator.
    pub fn reflected(&self, nmax: usize) -> Self {
        let mut out = self.clone();
        for m in 0..=nmax {
            for n in m..=nmax {
                let index = spectral_index(nmax, m, n);
                if (n + m) % 2 == 1 {
                    out.p[index] = -out.p[index];
                    out.mp[index] = -out.mp[index];
                } else {
                    out.dp[index] = -out.dp[index];
                }
            }
        }
        out
    }
}

fn epsilon(n: usize, m: usize) -> f64 {
    if n <= m {
        return 0.0;
    }
    let (n, m) = (n as f64, m as f64);
    ((n * n - m * m) / (4.0 * n * n - 1.0)).sqrt()
}

/// Values for degrees `m..=nlast` seeded with the sectoral value at `n = m`.
fn recur_in_degree(m: usize, nlast: usize, x: f64, seed: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(nlast + 1 - m);
    out.push(seed);
    if nlast > m {
        out.push(((2 * m + 3) as f64).sqrt() * x * seed);
    }
    for n in (m + 2)..=nlast {
        let (nf, mf) = (n as f64, m as f64);
        let a = ((4.0 * nf * nf - 1.0) / (nf * nf - mf * mf)).sqrt();
        let b = (((nf - 1.0).powi(2) - mf * mf) / (4.0 * (nf - 1.0).powi(2) - 1.0)).sqrt();
        let k = n - m;
        out.push(a * (x * out[k - 1] - b * out[k - 2]));
    }
    out
}

const MIRROR_TOLERANCE: f64 = 1e-10;

#[derive(Clone, Copy, Debug)]
enum Slot {
    Direct(usize),
    Mirrored(usize),
}

struct StoredColumns {
    columns: Vec<LegendreColumn>,
    slots: Vec<Slot>,
}

impl StoredColumns {
    /// Southern colatitudes whose northern mirror is already stored are
    /// served by reflection.
    fn new(colatitudes: &[f64], nmax: usize) -> Self {
        let mut order: Vec<usize> = (0..colatitudes.len()).collect();
        order.sort_by(|&a, &b| colatitudes[a].total_cmp(&colatitudes[b]));
        let mut columns: Vec<LegendreColumn> = Vec::new();
        // (colatitude, slot) of stored columns, ascending
        let mut northern: Vec<(f64, usize)> = Vec::new();
        let mut slots = vec![Slot::Direct(0); colatitudes.len()];
        for j in order {
            let theta = colatitudes[j];
            let mirror = PI - theta;
            let source = if theta > FRAC_PI_2 {
                let at = northern.partition_point(|(stored, _)| *stored < mirror - MIRROR_TOLERANCE);
                northern
                    .get(at)
                    .filter(|(stored, _)| (stored - mirror).abs() < MIRROR_TOLERANCE)
                    .map(|&(_, slot)| slot)
            } else {
                None
            };
            slots[j] = match source {
                Some(slot) => Slot::Mirrored(slot),
                None => {
                    columns.push(LegendreColumn::compute(theta, nmax));
                    northern.push((theta, columns.len() - 1));
                    Slot::Direct(columns.len() - 1)
                }
            };
        }
        Self { columns, slots }
    }
}

/// Legendre functions at a fixed set of colatitudes.
pub struct LegendreTable {
    colatitudes: Vec<f64>,
    nmax: usize,
    stored: Option<StoredColumns>,
}

impl LegendreTable {
    pub fn new(colatitudes: Vec<f64>, nmax: usize, mode: LegendreFunctions) -> Self {
        let stored = match mode {
            LegendreFunctions::Stored => {
                debug!(
                    "Storing Legendre functions for {} colatitudes up to n = {}",
                    colatitudes.len(),
                    nmax
                );
                let stored = StoredColumns::new(&colatitudes, nmax);
                debug!(
                    "{} of {} columns served by equatorial reflection",
                    colatitudes.len() - stored.columns.len(),
                    colatitudes.len()
                );
                Some(stored)
            }
            LegendreFunctions::Computed => None,
        };
        Self {
            colatitudes,
            nmax,
            stored,
        }
    }

    pub fn nmax(&self) -> usize {
        self.nmax
    }

    pub fn len(&self) -> usize {
        self.colatitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colatitudes.is_empty()
    }

    pub fn column(&self, j: usize) -> Cow<'_, LegendreColumn> {
        match &self.stored {
            Some(stored) => match stored.slots[j] {
                Slot::Direct(slot) => Cow::Borrowed(&stored.columns[slot]),
                Slot::Mirrored(slot) => Cow::Owned(stored.columns[slot].reflected(self.nmax)),
            },
            None => Cow::Owned(LegendreColumn::compute(self.colatitudes[j], self.nmax)),
        }
    }
}
