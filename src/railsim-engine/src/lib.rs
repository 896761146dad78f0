// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod config;
pub mod network;
pub mod variate;

pub mod lp;
pub mod solver;

pub mod allocation;
pub mod experiment;
pub mod model;
pub mod sensitivity;
pub mod sizing;
pub mod utilization;

pub use self::allocation::{Allocation, allocate};
pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::config::{
    CostConstants, ExperimentConfig, ModelConfig, RetryPolicy, Rounding, Sc3Formula, SolverBounds,
};
pub use self::experiment::{ExperimentRow, grid_values, run_experiment};
pub use self::lp::{LinearProgram, LpSolver, Simplex};
pub use self::model::{StationState, StepSnapshot, TransportModel};
pub use self::network::{FlowProvider, LinkId, RailNetwork, StationId};
pub use self::sensitivity::{Deltas, Estimate, estimate, estimate_until_valid};
pub use self::sizing::FacilitySizer;
pub use self::solver::{BisectionSolver, RootSolver};
pub use self::variate::{Distribution, Law, ReplaySampler, Sampler, SeededSampler};
