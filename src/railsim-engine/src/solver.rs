// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Root finding for sums of power terms, `Σ cᵢ·x^eᵢ = 0`.

use std::error;
use std::fmt;

pub const TERMS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct PowerSumEquation {
    pub low: f64,
    pub high: f64,
    pub accuracy: f64,
    pub coefficients: [f64; TERMS],
    pub exponents: [f64; TERMS],
}

impl PowerSumEquation {
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .zip(self.exponents.iter())
            .map(|(c, e)| c * x.powf(*e))
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    /// The function keeps one sign over the whole range. Holds the values
    /// at the range ends.
    NoSignChange { at_low: f64, at_high: f64 },
    NonConvergence(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolveError::NoSignChange { at_low, at_high } => {
                write!(f, "no sign change (f(low)={at_low}, f(high)={at_high})")
            }
            SolveError::NonConvergence(reason) => write!(f, "did not converge: {reason}"),
        }
    }
}

impl error::Error for SolveError {}

pub trait RootSolver {
    fn solve(&self, eq: &PowerSumEquation) -> Result<f64, SolveError>;
}

/// Scans the range for the first sign change, then bisects it down to the
/// requested accuracy.
#[derive(Clone, Debug)]
pub struct BisectionSolver {
    pub scan_intervals: usize,
    pub max_iterations: usize,
}

impl Default for BisectionSolver {
    fn default() -> Self {
        BisectionSolver {
            scan_intervals: 64,
            max_iterations: 200,
        }
    }
}

impl BisectionSolver {
    fn checked_eval(eq: &PowerSumEquation, x: f64) -> Result<f64, SolveError> {
        let value = eq.eval(x);
        if value.is_nan() {
            return Err(SolveError::NonConvergence(format!("f({x}) is NaN")));
        }
        Ok(value)
    }

    fn bisect(
        &self,
        eq: &PowerSumEquation,
        mut a: f64,
        mut b: f64,
        mut fa: f64,
    ) -> Result<f64, SolveError> {
        let mut iterations = 0;
        while b - a > eq.accuracy {
            if iterations == self.max_iterations {
                return Err(SolveError::NonConvergence(format!(
                    "bracket [{a}, {b}] still wider than {} after {iterations} iterations",
                    eq.accuracy
                )));
            }
            iterations += 1;
            let mid = (a + b) / 2.0;
            let fm = Self::checked_eval(eq, mid)?;
            if fm == 0.0 {
                return Ok(mid);
            }
            if (fa < 0.0) != (fm < 0.0) {
                b = mid;
            } else {
                a = mid;
                fa = fm;
            }
        }
        Ok((a + b) / 2.0)
    }
}

impl RootSolver for BisectionSolver {
    fn solve(&self, eq: &PowerSumEquation) -> Result<f64, SolveError> {
        if eq.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(SolveError::NonConvergence(format!(
                "non-finite coefficients {:?}",
                eq.coefficients
            )));
        }
        if !(eq.low < eq.high && eq.accuracy > 0.0) {
            return Err(SolveError::NonConvergence(format!(
                "bad range [{}, {}] / accuracy {}",
                eq.low, eq.high, eq.accuracy
            )));
        }

        let at_low = Self::checked_eval(eq, eq.low)?;
        if at_low == 0.0 {
            return Ok(eq.low);
        }

        let n = self.scan_intervals.max(1);
        let (mut prev, mut f_prev) = (eq.low, at_low);
        for i in 1..=n {
            let x = eq.low + (eq.high - eq.low) * i as f64 / n as f64;
            let fx = Self::checked_eval(eq, x)?;
            if fx == 0.0 {
                return Ok(x);
            }
            if (f_prev < 0.0) != (fx < 0.0) {
                return self.bisect(eq, prev, x, f_prev);
            }
            prev = x;
            f_prev = fx;
        }

        Err(SolveError::NoSignChange {
            at_low,
            at_high: f_prev,
        })
    }
}
