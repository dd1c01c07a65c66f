//! Polynomials over the complex numbers, stored lowest degree first,
//! and the solver that finds all of their roots at once.

use num::Complex;
use std::cmp::Ordering;

use errors::SampleError;
use roots::RootSet;

/// A polynomial of degree one or more.  Coefficients are stored lowest
/// degree first and the leading coefficient is never zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<Complex<f64>>,
}

/// Evaluates coefficients (lowest degree first) at `z` by Horner's rule.
#[inline]
fn horner(coeffs: &[Complex<f64>], z: Complex<f64>) -> Complex<f64> {
    coeffs
        .iter()
        .rev()
        .fold(Complex::new(0.0, 0.0), |acc, c| acc * z + *c)
}

impl Polynomial {
    /// Validates a coefficient sequence.
    pub fn new(coeffs: Vec<Complex<f64>>) -> Result<Polynomial, SampleError> {
        if coeffs.len() < 2 {
            return Err(SampleError::InvalidPolynomial(format!(
                "need at least two coefficients, got {}",
                coeffs.len()
            )));
        }

        if let Some(bad) = coeffs
            .iter()
            .position(|c| !c.re.is_finite() || !c.im.is_finite())
        {
            return Err(SampleError::InvalidPolynomial(format!(
                "coefficient {} is not finite",
                bad
            )));
        }

        if coeffs[coeffs.len() - 1] == Complex::new(0.0, 0.0) {
            return Err(SampleError::InvalidPolynomial(
                "leading coefficient is zero".to_string(),
            ));
        }

        Ok(Polynomial { coeffs })
    }

    /// Real coefficients, lowest degree first.
    pub fn from_real(coeffs: &[f64]) -> Result<Polynomial, SampleError> {
        Polynomial::new(coeffs.iter().map(|&c| Complex::new(c, 0.0)).collect())
    }

    /// The exponent of the leading term.
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Lowest degree first.
    pub fn coeffs(&self) -> &[Complex<f64>] {
        &self.coeffs
    }

    /// p(z).
    #[inline]
    pub fn eval(&self, z: Complex<f64>) -> Complex<f64> {
        horner(&self.coeffs, z)
    }

    /// The formal derivative.  A linear polynomial yields a constant,
    /// which is not itself a valid `Polynomial`, so the coefficients are
    /// returned bare.
    pub fn derivative(&self) -> Derivative {
        Derivative {
            coeffs: self
                .coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(power, c)| *c * (power as f64))
                .collect(),
        }
    }

    /// Every root, counted with multiplicity, in a stable order.
    pub fn roots(&self) -> RootSet {
        RootSet::new(solve(self))
    }
}

/// The coefficients of p', lowest degree first.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivative {
    coeffs: Vec<Complex<f64>>,
}

impl Derivative {
    /// p'(z).
    #[inline]
    pub fn eval(&self, z: Complex<f64>) -> Complex<f64> {
        horner(&self.coeffs, z)
    }

    /// Lowest degree first.
    pub fn coeffs(&self) -> &[Complex<f64>] {
        &self.coeffs
    }
}

const SOLVER_MAX_ROUNDS: usize = 1000;
const SOLVER_TOLERANCE: f64 = 1e-14;
const POLISH_STEPS: usize = 4;
// Below this a component is rounding noise and is snapped to zero.
const NOISE_FLOOR: f64 = 1e-12;
// Real parts in the same bucket of this width order roots by their
// imaginary part.
const ORDER_TOLERANCE: f64 = 1e-9;

/// Roots closer together than this, relative to their size, are taken
/// for copies of one repeated root.  A repeated root of multiplicity m
/// only comes out of the solver to about the m-th root of machine
/// precision, so they have to be gathered up afterwards.
pub const CLUSTER_TOLERANCE: f64 = 1e-3;

/// Finds every root of a polynomial by Durand-Kerner simultaneous
/// iteration.  The starting guesses are spread around a circle as wide
/// as the Cauchy bound so no two of them coincide.  Each cluster of
/// near-coincident results is then replaced by its mean, repeated once
/// per member, and every simple root is tightened with a few Newton
/// steps.  The roots come back in no particular order; `RootSet`
/// orders them.
pub fn solve(poly: &Polynomial) -> Vec<Complex<f64>> {
    let degree = poly.degree();
    let lead = poly.coeffs[degree];

    if degree == 1 {
        return vec![snap(-poly.coeffs[0] / lead)];
    }

    let monic: Vec<Complex<f64>> = poly.coeffs.iter().map(|c| *c / lead).collect();
    let radius = 1.0
        + monic[..degree]
            .iter()
            .map(|c| c.norm())
            .fold(0.0_f64, f64::max);

    let mut roots: Vec<Complex<f64>> = (0..degree)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * (k as f64) / (degree as f64) + 0.4;
            Complex::from_polar(&radius, &angle)
        })
        .collect();

    for _ in 0..SOLVER_MAX_ROUNDS {
        let mut largest_move = 0.0_f64;
        for k in 0..degree {
            let zk = roots[k];
            let mut denominator = Complex::new(1.0, 0.0);
            for (j, zj) in roots.iter().enumerate() {
                if j != k {
                    denominator = denominator * (zk - *zj);
                }
            }
            if denominator == Complex::new(0.0, 0.0) {
                // Two guesses collided; nudge this one off the other.
                roots[k] = zk + Complex::new(SOLVER_TOLERANCE, SOLVER_TOLERANCE);
                largest_move = std::f64::INFINITY;
                continue;
            }
            let delta = horner(&monic, zk) / denominator;
            roots[k] = zk - delta;
            largest_move = largest_move.max(delta.norm() / (1.0 + zk.norm()));
        }
        if largest_move < SOLVER_TOLERANCE {
            break;
        }
    }

    let multiplicity = merge_clusters(&mut roots);
    let derivative = poly.derivative();
    for (root, _) in roots
        .iter_mut()
        .zip(multiplicity)
        .filter(|&(_, count)| count == 1)
    {
        for _ in 0..POLISH_STEPS {
            let slope = derivative.eval(*root);
            if slope == Complex::new(0.0, 0.0) {
                break;
            }
            let next = *root - poly.eval(*root) / slope;
            if !next.re.is_finite() || !next.im.is_finite() {
                break;
            }
            *root = next;
        }
    }

    roots.into_iter().map(snap).collect()
}

fn near(a: Complex<f64>, b: Complex<f64>) -> bool {
    (a - b).norm() < CLUSTER_TOLERANCE * (1.0 + a.norm().max(b.norm()))
}

/// Gathers roots that lie near one another, transitively, and moves
/// every member of a group onto the group's mean.  Returns the size of
/// the group each root ended up in.
fn merge_clusters(roots: &mut [Complex<f64>]) -> Vec<usize> {
    let mut group: Vec<Option<usize>> = vec![None; roots.len()];
    let mut sizes = vec![1; roots.len()];

    for leader in 0..roots.len() {
        if group[leader].is_some() {
            continue;
        }
        group[leader] = Some(leader);
        let mut members = vec![leader];
        let mut pending = vec![leader];
        while let Some(k) = pending.pop() {
            for j in 0..roots.len() {
                if group[j].is_none() && near(roots[k], roots[j]) {
                    group[j] = Some(leader);
                    members.push(j);
                    pending.push(j);
                }
            }
        }
        if members.len() == 1 {
            continue;
        }

        let sum = members
            .iter()
            .fold(Complex::new(0.0, 0.0), |acc, &m| acc + roots[m]);
        let mean = sum / (members.len() as f64);
        for &m in &members {
            roots[m] = mean;
            sizes[m] = members.len();
        }
    }

    sizes
}

fn snap(z: Complex<f64>) -> Complex<f64> {
    let scale = NOISE_FLOOR * (1.0 + z.norm());
    Complex::new(
        if z.re.abs() < scale { 0.0 } else { z.re },
        if z.im.abs() < scale { 0.0 } else { z.im },
    )
}

fn real_bucket(z: &Complex<f64>) -> f64 {
    (z.re / ORDER_TOLERANCE).round()
}

/// Real part first, then imaginary part.  Real parts are compared by
/// the `ORDER_TOLERANCE`-wide bucket they fall in, so solver noise in
/// the real part does not reorder roots that share it, and the order
/// stays total.
pub fn root_order(a: &Complex<f64>, b: &Complex<f64>) -> Ordering {
    real_bucket(a)
        .partial_cmp(&real_bucket(b))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.im.partial_cmp(&b.im).unwrap_or(Ordering::Equal))
}
