//! Rank-one over-approximation via iterative majorization
//!
//! A coverage matrix is approximated from above by a non-negative
//! rank-one envelope `K * E`. The initial factorization comes from a
//! truncated (largest singular value) decomposition; a multiplier matrix
//! then accumulates evidence wherever the current estimate under-shoots
//! the input, nudging the next rank-one fit upward at those positions.

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

/// Iteration cap for the power method computing the leading factor pair.
const POWER_ITER_CAP: usize = 64;

/// Relative tolerance on the leading singular value between power steps.
const POWER_TOL: f64 = 1e-12;

/// Leading rank-one factor pair of `x`.
///
/// Returns `(K, E)` where `K` has one entry per sample (left singular
/// vector scaled by the singular value) and `E` has one entry per
/// position (unit right singular vector), so `K ⊗ E` is the best
/// rank-one approximation of `x` in the least-squares sense.
///
/// Computed by deterministic power iteration on a uniform start vector.
/// For the non-negative matrices seen here the leading singular pair is
/// itself non-negative, so the iteration never leaves the positive
/// orthant. An all-zero input yields `K = 0`.
pub fn leading_factor(x: ArrayView2<f64>) -> (Array1<f64>, Array1<f64>) {
    let (n_samples, n_positions) = x.dim();

    let mut v = Array1::from_elem(n_positions, 1.0 / (n_positions as f64).sqrt());
    let mut u = Array1::<f64>::zeros(n_samples);
    let mut sigma = 0.0;
    let mut sigma_prev = f64::INFINITY;

    for _ in 0..POWER_ITER_CAP {
        u = x.dot(&v);
        let u_norm = u.dot(&u).sqrt();
        if u_norm <= f64::MIN_POSITIVE {
            return (Array1::zeros(n_samples), v);
        }
        u.mapv_inplace(|val| val / u_norm);

        let w = x.t().dot(&u);
        sigma = w.dot(&w).sqrt();
        if sigma <= f64::MIN_POSITIVE {
            return (Array1::zeros(n_samples), v);
        }
        v = w.mapv(|val| val / sigma);

        if (sigma - sigma_prev).abs() <= POWER_TOL * sigma.max(1.0) {
            break;
        }
        sigma_prev = sigma;
    }

    (u.mapv(|val| val * sigma), v)
}

/// Outer product `k ⊗ e` as a samples x positions matrix.
pub(crate) fn outer(k: &Array1<f64>, e: &Array1<f64>) -> Array2<f64> {
    let k2 = k.view().insert_axis(Axis(1));
    let e2 = e.view().insert_axis(Axis(0));
    k2.dot(&e2)
}

/// Raise `estimate` to `x` wherever it under-shoots.
fn enforce_envelope(estimate: &mut Array2<f64>, x: ArrayView2<f64>) {
    Zip::from(estimate).and(x).for_each(|est, &obs| {
        if *est < obs {
            *est = obs;
        }
    });
}

/// Core majorization loop shared by the estimate and factor entry points.
///
/// The multiplier `lambda` starts at zero and is updated each iteration
/// with step size `1 / sqrt(iterations)`: it grows where the estimate is
/// below the input and is clipped at zero, so refactorizing
/// `estimate + lambda` pushes the envelope up over under-covered
/// positions. The iteration count is fixed; there is no convergence test.
fn majorize(x: ArrayView2<f64>, iterations: usize) -> (Array1<f64>, Array1<f64>, Array2<f64>) {
    let (mut k, mut e) = leading_factor(x);
    let mut estimate = outer(&k, &e);

    let mut lambda = Array2::<f64>::zeros(x.raw_dim());
    let step = 1.0 / (iterations as f64).sqrt();

    for _ in 0..iterations {
        Zip::from(&mut lambda)
            .and(&estimate)
            .and(x)
            .for_each(|l, &est, &obs| {
                *l = (*l - (est - obs) * step).max(0.0);
            });

        let target = &estimate + &lambda;
        let (k_next, e_next) = leading_factor(target.view());
        k = k_next;
        e = e_next;
        estimate = outer(&k, &e);
    }

    (k, e, estimate)
}

/// Fit a rank-one over-approximating envelope to `x` and return it as a
/// full matrix. The over-approximation guarantee `estimate >= x` is
/// enforced elementwise after the fixed iteration budget.
pub fn over_approximate(x: ArrayView2<f64>, iterations: usize) -> Array2<f64> {
    let (_, _, mut estimate) = majorize(x, iterations);
    enforce_envelope(&mut estimate, x);
    estimate
}

/// Fit the envelope and return the absolute-valued factor pair `(K, E)`
/// instead of the combined estimate.
pub fn over_approximate_factors(
    x: ArrayView2<f64>,
    iterations: usize,
) -> (Array1<f64>, Array1<f64>) {
    let (k, e, _) = majorize(x, iterations);
    (k.mapv(f64::abs), e.mapv(f64::abs))
}
