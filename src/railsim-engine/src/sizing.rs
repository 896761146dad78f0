// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Optimal locomotive and gear counts for a single station.
//!
//! The locomotive count is the root of the first-order optimality condition
//! of the station's hourly cost,
//!
//! ```text
//! k0 + k1·ln^-0.336 + k2·ln^-1.429 + k3·ln^-1.054 + k4·ln^-0.695 = 0
//! ```
//!
//! where `k4` depends on the gear count. The equation is solved once with an
//! assumed gear count, the gear count is re-estimated from that result, and
//! the equation is solved again with the refined gear term.

use tracing::debug;

use crate::common::Result;
use crate::config::ModelConfig;
use crate::sim_err;
use crate::solver::{PowerSumEquation, RootSolver, SolveError, TERMS};

pub const LOCOMOTIVE_EXPONENTS: [f64; TERMS] = [0.0, -0.336, -1.429, -1.054, -0.695];

pub struct FacilitySizer<'a> {
    config: &'a ModelConfig,
    solver: &'a dyn RootSolver,
}

impl<'a> FacilitySizer<'a> {
    pub fn new(config: &'a ModelConfig, solver: &'a dyn RootSolver) -> Self {
        FacilitySizer { config, solver }
    }

    /// Gear-dependent `k4` term of the locomotive equation.
    fn gear_term(&self, eq: f64, et: f64, gear: u32, lead: f64) -> f64 {
        let c = &self.config.costs;
        lead * c.wagon_loaded
            * self.config.mean_service_time.powf(1.129)
            * eq.powf(2.982)
            * et.powf(-2.698)
            * f64::from(gear).powf(-2.368)
    }

    pub fn locomotive_equation(&self, eq: f64, et: f64, gear: u32, lead: f64) -> PowerSumEquation {
        let c = &self.config.costs;
        let bounds = &self.config.solver;
        PowerSumEquation {
            low: bounds.low,
            high: bounds.high,
            accuracy: bounds.accuracy,
            coefficients: [
                24.0 * c.locomotive_idle,
                60.0 * (c.locomotive_run - c.locomotive_idle) * eq.powf(0.884) * et.powf(-0.885),
                -932.0 * c.wagon_loaded * eq.powf(2.527) * et.powf(-1.979),
                -9.5 * c.wagon_empty * eq.powf(0.978) * et.powf(-0.865),
                self.gear_term(eq, et, gear, lead),
            ],
            exponents: LOCOMOTIVE_EXPONENTS,
        }
    }

    /// Continuous optimum of the locomotive equation. When the cost
    /// derivative keeps one sign over the whole range the optimum sits on
    /// the bound the cost decreases towards.
    fn solve_continuous(&self, equation: &PowerSumEquation) -> Result<f64> {
        match self.solver.solve(equation) {
            Ok(root) => Ok(root),
            Err(SolveError::NoSignChange { at_low, at_high }) => {
                let bound = if at_low > 0.0 {
                    equation.low
                } else {
                    equation.high
                };
                debug!(at_low, at_high, bound, "locomotive optimum on range bound");
                Ok(bound)
            }
            Err(err @ SolveError::NonConvergence(_)) => {
                sim_err!(SolverNonConvergence, err.to_string())
            }
        }
    }

    fn to_count(&self, value: f64) -> u32 {
        let rounded = self.config.rounding.apply(value);
        // NaN lands here too
        if !(rounded > 1.0) { 1 } else { rounded as u32 }
    }

    pub fn size_locomotives(&self, eq: f64, et: f64) -> Result<u32> {
        check_ratios(eq, et)?;

        let mut equation =
            self.locomotive_equation(eq, et, self.config.initial_gear_guess, self.config.first_lead);
        let first = self.to_count(self.solve_continuous(&equation)?);

        let gear = self.size_gear(eq, et, first);
        equation.coefficients[4] = self.gear_term(eq, et, gear, self.config.second_lead);
        let refined = self.solve_continuous(&equation)?;

        Ok(self.to_count(refined))
    }

    pub fn size_gear(&self, eq: f64, et: f64, locomotives: u32) -> u32 {
        let c = &self.config.costs;
        let estimate = 12.36
            * f64::from(locomotives).powf(0.091)
            * self.config.mean_service_time.powf(0.335)
            * eq.powf(0.885)
            * (c.wagon_loaded / c.gear_operation).powf(0.297)
            / et.powf(0.801);
        self.to_count(estimate)
    }
}

pub(crate) fn check_ratios(eq: f64, et: f64) -> Result<()> {
    if !(eq > 0.0 && eq.is_finite() && et > 0.0 && et.is_finite()) {
        return sim_err!(DegenerateInput, format!("EQ={eq}, ET={et}"));
    }
    Ok(())
}
