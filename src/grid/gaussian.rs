// xspharm/src/grid/gaussian.rs

use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;

/// Gauss-Legendre nodes and weights on [-1, 1].
///
/// Nodes are returned in descending order, so that index 0 is the point
/// closest to the north pole. Weights sum to 2.
pub fn gauss_legendre(npoints: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; npoints];
    let mut weights = vec![0.0; npoints];
    let half = (npoints + 1) / 2;
    for i in 0..half {
        let mut x = (PI * (i as f64 + 0.75) / (npoints as f64 + 0.5)).cos();
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (p, dp) = legendre_and_derivative(npoints, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() <= 1e-16 {
                break;
            }
        }
        let (_, dp) = legendre_and_derivative(npoints, x);
        let weight = 2.0 / ((1.0 - x * x) * dp * dp);
        nodes[i] = x;
        nodes[npoints - 1 - i] = -x;
        weights[i] = weight;
        weights[npoints - 1 - i] = weight;
    }
    (nodes, weights)
}

/// Gaussian latitudes in degrees, north to south.
pub fn gaussian_latitudes(nlat: usize) -> Vec<f64> {
    let (nodes, _) = gauss_legendre(nlat);
    nodes.iter().map(|x| x.asin().to_degrees()).collect()
}

/// Equally spaced pole-to-pole latitudes in degrees, north to south.
pub fn regular_latitudes(nlat: usize) -> Vec<f64> {
    let step = 180.0 / (nlat as f64 - 1.0);
    (0..nlat).map(|j| 90.0 - j as f64 * step).collect()
}

fn legendre_and_derivative(degree: usize, x: f64) -> (f64, f64) {
    if degree == 0 {
        return (1.0, 0.0);
    }
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=degree {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let dp = degree as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_two() {
        for n in [1, 2, 7, 32, 73] {
            let (_, weights) = gauss_legendre(n);
            let total: f64 = weights.iter().sum();
            assert!((total - 2.0).abs() < 1e-13, "n={} total={}", n, total);
        }
    }

    #[test]
    fn test_nodes_descend_and_are_symmetric() {
        let (nodes, _) = gauss_legendre(9);
        assert!(nodes.windows(2).all(|pair| pair[0] > pair[1]));
        for i in 0..nodes.len() {
            assert!((nodes[i] + nodes[nodes.len() - 1 - i]).abs() < 1e-15);
        }
        assert!(nodes[4].abs() < 1e-15);
    }

    #[test]
    fn test_quadrature_is_exact_for_polynomials() {
        let n = 6;
        let (nodes, weights) = gauss_legendre(n);
        // exact up to degree 2n - 1
        for degree in 0..(2 * n) {
            let approx: f64 = nodes
                .iter()
                .zip(weights.iter())
                .map(|(x, w)| w * x.powi(degree as i32))
                .sum();
            let exact = if degree % 2 == 0 {
                2.0 / (degree as f64 + 1.0)
            } else {
                0.0
            };
            assert!((approx - exact).abs() < 1e-13, "degree {}", degree);
        }
    }

    #[test]
    fn test_latitude_helpers() {
        let regular = regular_latitudes(73);
        assert_eq!(regular[0], 90.0);
        assert_eq!(regular[36], 0.0);
        assert_eq!(regular[72], -90.0);

        let gaussian = gaussian_latitudes(4);
        assert!((gaussian[0] - 59.4444).abs() < 1e-3);
        assert!((gaussian[1] - 19.8757).abs() < 1e-3);
        assert!((gaussian[3] + 59.4444).abs() < 1e-3);
    }
}
