// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::debug;

use crate::common::Result;
use crate::lp::{Constraint, LinearProgram, LpSolver, Sense};
use crate::model::TransportModel;
use crate::network::FlowProvider;
use crate::sensitivity::{Estimate, estimate_until_valid};
use crate::variate::{Distribution, Sampler};

pub const SHARES: usize = 4;

/// Split of a development budget across the four objective terms.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub estimate: Estimate,
    pub shares: [f64; SHARES],
    pub value: f64,
}

/// `maximize sc·x` with the shares summing to one and each at least
/// `min_share`.
pub fn allocation_program(coefficients: &[f64; SHARES], min_share: f64) -> LinearProgram {
    let mut constraints = vec![
        Constraint::new(vec![1.0; SHARES], 1.0),
        Constraint::new(vec![-1.0; SHARES], -1.0),
    ];
    for i in 0..SHARES {
        let mut row = vec![0.0; SHARES];
        row[i] = -1.0;
        constraints.push(Constraint::new(row, -min_share));
    }
    LinearProgram {
        sense: Sense::Maximize,
        objective: coefficients.to_vec(),
        constraints,
    }
}

pub fn allocate(
    model: &mut TransportModel,
    provider: &mut dyn FlowProvider,
    inter_arrival: &Distribution,
    batch_size: &Distribution,
    sampler: &mut dyn Sampler,
    lp_solver: &dyn LpSolver,
) -> Result<Allocation> {
    let estimate = estimate_until_valid(model, provider, inter_arrival, batch_size, sampler)?;
    let program = allocation_program(&estimate.coefficients, model.config().min_share);
    let solution = lp_solver.solve(&program)?;

    let mut shares = [0.0; SHARES];
    shares.copy_from_slice(&solution.variables);
    debug!(value = solution.value, ?shares, "allocation solved");
    Ok(Allocation {
        estimate,
        shares,
        value: solution.value,
    })
}
