//! Brent's method for bracketed root finding
//!
//! A robust root-finding algorithm combining bisection, secant method,
//! and inverse quadratic interpolation.
//!
//! Reference: Brent, R.P. (1973). "Algorithms for Minimization without
//! Derivatives". Prentice-Hall.

use crate::error::{Error, Result};

/// Final sign-change interval around a root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub a: f64,
    pub fa: f64,
    pub b: f64,
    pub fb: f64,
}

impl Bracket {
    /// Endpoint with the smaller residual
    pub fn best(&self) -> f64 {
        if self.fa.abs() < self.fb.abs() {
            self.a
        } else {
            self.b
        }
    }

    /// Endpoint where the function is non-negative
    pub fn non_negative_side(&self) -> f64 {
        if self.fb >= 0.0 {
            self.b
        } else {
            self.a
        }
    }
}

/// Brent root finder over a fallible function
#[derive(Debug, Clone, PartialEq)]
pub struct BrentSolver {
    /// Interval width at which iteration stops
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for BrentSolver {
    fn default() -> Self {
        Self {
            tol: 1e-12,
            max_iter: 50,
        }
    }
}

impl BrentSolver {
    pub fn new(tol: f64, max_iter: usize) -> Self {
        Self { tol, max_iter }
    }

    /// Narrow `[a, b]` around a root of `f`
    ///
    /// `f(a)` and `f(b)` must have opposite signs (or one must be zero). The
    /// returned bracket still straddles the sign change, so callers can pick
    /// the side they need.
    pub fn find_root<F>(
        &self,
        mut f: F,
        mut a: f64,
        mut b: f64,
        fa: Option<f64>,
        fb: Option<f64>,
    ) -> Result<Bracket>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let mut fa = match fa {
            Some(value) => value,
            None => f(a)?,
        };
        let mut fb = match fb {
            Some(value) => value,
            None => f(b)?,
        };

        if fa == 0.0 {
            return Ok(Bracket { a, fa, b: a, fb: fa });
        }
        if fb == 0.0 {
            return Ok(Bracket { a: b, fa: fb, b, fb });
        }
        if fa * fb > 0.0 {
            return Err(Error::InvalidArgument(format!(
                "root not bracketed: f({}) = {}, f({}) = {}",
                a, fa, b, fb
            )));
        }

        // Keep |f(a)| >= |f(b)| so b is the best guess
        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }

        let mut c = a;
        let mut fc = fa;
        let mut mflag = true;
        let mut d = b - a;

        for _ in 0..self.max_iter {
            if fa.abs() < fb.abs() {
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut fa, &mut fb);
            }

            if fb == 0.0 {
                return Ok(Bracket { a: b, fa: fb, b, fb });
            }
            if (b - a).abs() <= self.tol {
                return Ok(Bracket { a, fa, b, fb });
            }

            let s = if fa != fc && fb != fc && fa != fb {
                // Inverse quadratic interpolation
                a * fb * fc / ((fa - fb) * (fa - fc))
                    + b * fa * fc / ((fb - fa) * (fb - fc))
                    + c * fa * fb / ((fc - fa) * (fc - fb))
            } else if fb != fa {
                // Secant
                b - fb * (b - a) / (fb - fa)
            } else {
                (a + b) / 2.0
            };

            let use_bisection = (s - (3.0 * a + b) / 4.0) * (s - b) > 0.0
                || (mflag && (s - b).abs() >= (b - c).abs() / 2.0)
                || (!mflag && (s - b).abs() >= (c - d).abs() / 2.0)
                || (mflag && (b - c).abs() < self.tol)
                || (!mflag && (c - d).abs() < self.tol);

            let s = if use_bisection {
                mflag = true;
                (a + b) / 2.0
            } else {
                mflag = false;
                s
            };

            let fs = f(s)?;
            d = c;
            c = b;
            fc = fb;

            if fa * fs < 0.0 {
                b = s;
                fb = fs;
            } else {
                a = s;
                fa = fs;
            }
        }

        Err(Error::NonConvergent(format!(
            "Brent search stalled after {} iterations near {}",
            self.max_iter, b
        )))
    }
}
