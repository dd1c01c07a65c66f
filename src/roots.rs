//! Matching approximate roots to true ones.
//!
//! Newton's method tells us where each pixel's orbit settled, but not
//! which root that is.  Once the sampling pass is over, every settled
//! point is compared against the true roots of the polynomial and given
//! the index of the nearest one, provided it is close enough.  This
//! pass never runs interleaved with iteration.

use num::Complex;
use std::ops::Index;
use std::slice::Iter;

use polynomial::{root_order, Polynomial};
use threads::for_each_band;

/// How far an approximate root may lie from a true root and still be
/// taken for it.
pub const ROOT_MATCH_TOLERANCE: f64 = 1e-3;

/// The root index recorded for a pixel that matched no true root.
pub const NO_ROOT: i32 = -1;

/// The true roots of a polynomial, sorted by real part and then
/// imaginary part.  Indices into this set are what Newton samples
/// report.
#[derive(Clone, Debug, PartialEq)]
pub struct RootSet {
    roots: Vec<Complex<f64>>,
}

impl RootSet {
    /// Sorts the roots into their stable order.
    pub fn new(mut roots: Vec<Complex<f64>>) -> RootSet {
        roots.sort_by(root_order);
        RootSet { roots }
    }

    /// Number of roots, which is the degree of the polynomial.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// True only for a set built from nothing.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The roots in order.
    pub fn as_slice(&self) -> &[Complex<f64>] {
        &self.roots
    }

    /// The roots in order.
    pub fn iter(&self) -> Iter<Complex<f64>> {
        self.roots.iter()
    }

    /// How many times the root at `index` occurs.  Copies of a repeated
    /// root are stored as identical values next to one another.
    pub fn multiplicity(&self, index: usize) -> usize {
        let root = self.roots[index];
        self.roots.iter().filter(|r| **r == root).count()
    }

    /// The index of the true root nearest to `z`, and how far away it
    /// is.  When two roots are equally near, within rounding, the lower
    /// index wins.  A non-finite `z` is near nothing.
    pub fn nearest(&self, z: Complex<f64>) -> Option<(usize, f64)> {
        self.roots
            .iter()
            .enumerate()
            .fold(None, |best, (index, root)| {
                let distance = (z - *root).norm();
                if !distance.is_finite() {
                    return best;
                }
                match best {
                    Some((_, nearest)) if nearest - distance <= ::std::f64::EPSILON * nearest.max(1.0) => {
                        best
                    }
                    _ => Some((index, distance)),
                }
            })
    }
}

impl Index<usize> for RootSet {
    type Output = Complex<f64>;

    fn index(&self, index: usize) -> &Complex<f64> {
        &self.roots[index]
    }
}

/// Assigns each approximate root the index of a true root in a
/// `RootSet`, or `NO_ROOT`.  Each root has its own reach: how far an
/// approximate root may lie from it and still be taken for it.
#[derive(Clone, Debug)]
pub struct RootMatcher<'a> {
    roots: &'a RootSet,
    reach: Vec<f64>,
}

impl<'a> RootMatcher<'a> {
    /// Matches within `ROOT_MATCH_TOLERANCE` of every root.
    pub fn new(roots: &'a RootSet) -> RootMatcher<'a> {
        RootMatcher::with_tolerance(roots, ROOT_MATCH_TOLERANCE)
    }

    /// Matches within a caller-chosen distance of every root.
    pub fn with_tolerance(roots: &'a RootSet, tolerance: f64) -> RootMatcher<'a> {
        RootMatcher {
            roots,
            reach: vec![tolerance; roots.len()],
        }
    }

    /// Matches the results of a Newton iteration on `poly` that stops
    /// once `|p(z)| < residual`.
    ///
    /// Near a root `r` of multiplicity `m`, `|p(z)|` behaves like
    /// `K |z - r|^m`, where `K` is the leading coefficient's size times
    /// the distance from `r` to every other distinct root.  Stopping on
    /// the residual therefore only pins `z` down to `(residual / K)^(1/m)`,
    /// which for a repeated root is far wider than
    /// `ROOT_MATCH_TOLERANCE`.  Each root's reach is twice that
    /// distance, and never less than `ROOT_MATCH_TOLERANCE`.
    pub fn for_residual(roots: &'a RootSet, poly: &Polynomial, residual: f64) -> RootMatcher<'a> {
        let lead = poly.coeffs()[poly.degree()].norm();
        let reach = roots
            .iter()
            .enumerate()
            .map(|(index, root)| {
                let scale = roots
                    .iter()
                    .filter(|other| *other != root)
                    .fold(lead, |k, other| k * (*root - *other).norm());
                let m = roots.multiplicity(index) as f64;
                let settled = 2.0 * (residual / scale).powf(1.0 / m);
                if settled.is_finite() {
                    settled.max(ROOT_MATCH_TOLERANCE)
                } else {
                    ROOT_MATCH_TOLERANCE
                }
            })
            .collect();
        RootMatcher { roots, reach }
    }

    /// How far from the root at `index` a match may lie.
    pub fn reach(&self, index: usize) -> f64 {
        self.reach[index]
    }

    /// The index of the true root `approx` stands for, if it lies
    /// strictly within that root's reach.  Copies of a repeated root
    /// always resolve to the first copy.
    pub fn match_root(&self, approx: Complex<f64>) -> Option<usize> {
        match self.roots.nearest(approx) {
            Some((index, distance)) if distance < self.reach[index] => Some(index),
            _ => None,
        }
    }

    /// One pixel's root index.  A pixel that hit the iteration cap did
    /// not converge, and is unmatched wherever its last iterate lies.
    pub fn root_index(&self, approx: Complex<f64>, iterations: u32, limit: u32) -> i32 {
        if iterations >= limit {
            return NO_ROOT;
        }
        match self.match_root(approx) {
            Some(index) => index as i32,
            None => NO_ROOT,
        }
    }

    /// Root indices for a whole row-major grid of Newton results,
    /// computed a band of rows per worker.
    pub fn assign(
        &self,
        approx: &[Complex<f64>],
        iterations: &[u32],
        limit: u32,
        width: usize,
        workers: usize,
    ) -> Vec<i32> {
        debug_assert_eq!(approx.len(), iterations.len());
        let mut indices = vec![NO_ROOT; approx.len()];
        for_each_band(&mut indices, width, workers, |rows, chunk| {
            let first = rows.start * width;
            let cells = approx[first..].iter().zip(iterations[first..].iter());
            for (index, (z, itr)) in chunk.iter_mut().zip(cells) {
                *index = self.root_index(*z, *itr, limit);
            }
        });
        indices
    }
}
