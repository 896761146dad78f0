// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Small dense linear programs: `optimize c·x` subject to `A·x ≤ b`,
//! `x ≥ 0`.

use float_cmp::approx_eq;

use crate::common::Result;
use crate::opt_err;

const EPS: f64 = 1e-9;

/// `coefficients · x ≤ bound`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub coefficients: Vec<f64>,
    pub bound: f64,
}

impl Constraint {
    pub fn new(coefficients: Vec<f64>, bound: f64) -> Self {
        Constraint {
            coefficients,
            bound,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearProgram {
    pub sense: Sense,
    pub objective: Vec<f64>,
    pub constraints: Vec<Constraint>,
}

impl LinearProgram {
    pub fn value(&self, variables: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(variables.iter())
            .map(|(c, x)| c * x)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LpSolution {
    pub variables: Vec<f64>,
    pub value: f64,
}

pub trait LpSolver {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution>;
}

/// Two-phase tableau simplex with Bland's rule.
#[derive(Clone, Debug)]
pub struct Simplex {
    pub max_pivots: usize,
}

impl Default for Simplex {
    fn default() -> Self {
        Simplex { max_pivots: 10_000 }
    }
}

struct Tableau {
    rows: Vec<Vec<f64>>,
    basis: Vec<usize>,
    // index of the right-hand side column
    rhs: usize,
}

impl Tableau {
    fn pivot(&mut self, row: usize, col: usize) {
        let p = self.rows[row][col];
        for v in self.rows[row].iter_mut() {
            *v /= p;
        }
        let pivot_row = self.rows[row].clone();
        for (i, r) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor != 0.0 {
                for (v, pv) in r.iter_mut().zip(pivot_row.iter()) {
                    *v -= factor * pv;
                }
            }
        }
        self.basis[row] = col;
    }

    /// Maximize `cost · z` over the columns below `allowed`.
    fn optimize(&mut self, cost: &[f64], allowed: usize, max_pivots: usize) -> Result<()> {
        for _ in 0..max_pivots {
            let entering = (0..allowed).find(|&j| {
                let reduced = cost[j]
                    - self
                        .rows
                        .iter()
                        .zip(self.basis.iter())
                        .map(|(r, &b)| cost[b] * r[j])
                        .sum::<f64>();
                reduced > EPS
            });
            let Some(col) = entering else {
                return Ok(());
            };

            let mut leaving: Option<(usize, f64)> = None;
            for (i, r) in self.rows.iter().enumerate() {
                if r[col] > EPS {
                    let ratio = r[self.rhs] / r[col];
                    let better = match leaving {
                        None => true,
                        Some((l, best)) => {
                            ratio < best - EPS
                                || (ratio <= best + EPS && self.basis[i] < self.basis[l])
                        }
                    };
                    if better {
                        leaving = Some((i, ratio));
                    }
                }
            }
            let Some((row, _)) = leaving else {
                return opt_err!(Unbounded, format!("column {col} has no limiting row"));
            };
            self.pivot(row, col);
        }
        opt_err!(
            Generic,
            format!("simplex did not terminate within {max_pivots} pivots")
        )
    }
}

impl LpSolver for Simplex {
    fn solve(&self, lp: &LinearProgram) -> Result<LpSolution> {
        let n = lp.objective.len();
        let m = lp.constraints.len();
        if let Some(bad) = lp.constraints.iter().find(|c| c.coefficients.len() != n) {
            return opt_err!(
                BadConfig,
                format!(
                    "constraint has {} coefficients, objective has {n}",
                    bad.coefficients.len()
                )
            );
        }

        let artificial_count = lp.constraints.iter().filter(|c| c.bound < 0.0).count();
        let width = n + m + artificial_count;
        let mut tableau = Tableau {
            rows: Vec::with_capacity(m),
            basis: Vec::with_capacity(m),
            rhs: width,
        };

        let mut next_artificial = n + m;
        for (i, c) in lp.constraints.iter().enumerate() {
            let sign = if c.bound < 0.0 { -1.0 } else { 1.0 };
            let mut row = vec![0.0; width + 1];
            for (j, a) in c.coefficients.iter().enumerate() {
                row[j] = sign * a;
            }
            row[n + i] = sign;
            row[width] = sign * c.bound;
            if sign < 0.0 {
                row[next_artificial] = 1.0;
                tableau.basis.push(next_artificial);
                next_artificial += 1;
            } else {
                tableau.basis.push(n + i);
            }
            tableau.rows.push(row);
        }

        if artificial_count > 0 {
            let mut phase1 = vec![0.0; width];
            for cost in phase1.iter_mut().skip(n + m) {
                *cost = -1.0;
            }
            tableau.optimize(&phase1, width, self.max_pivots)?;

            let infeasibility: f64 = tableau
                .rows
                .iter()
                .zip(tableau.basis.iter())
                .filter(|&(_, &b)| b >= n + m)
                .map(|(r, _)| r[width])
                .sum();
            if !approx_eq!(f64, infeasibility, 0.0, epsilon = 1e-7) {
                return opt_err!(
                    Infeasible,
                    format!("constraints cannot all hold (residual {infeasibility})")
                );
            }

            // drive zero-valued artificials out of the basis
            for i in 0..m {
                if tableau.basis[i] >= n + m {
                    if let Some(col) = (0..n + m).find(|&j| tableau.rows[i][j].abs() > EPS) {
                        tableau.pivot(i, col);
                    }
                }
            }
        }

        let sign = match lp.sense {
            Sense::Maximize => 1.0,
            Sense::Minimize => -1.0,
        };
        let mut phase2 = vec![0.0; width];
        for (j, c) in lp.objective.iter().enumerate() {
            phase2[j] = sign * c;
        }
        tableau.optimize(&phase2, n + m, self.max_pivots)?;

        let mut variables = vec![0.0; n];
        for (r, &b) in tableau.rows.iter().zip(tableau.basis.iter()) {
            if b < n {
                variables[b] = r[width];
            }
        }
        let value = lp.value(&variables);
        Ok(LpSolution { variables, value })
    }
}
