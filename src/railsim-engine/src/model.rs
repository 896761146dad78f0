// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::Result;
use crate::config::ModelConfig;
use crate::network::{FlowProvider, LinkId, StationId};
use crate::sizing::{FacilitySizer, check_ratios};
use crate::solver::{BisectionSolver, RootSolver};
use crate::utilization::{StationLoad, total_gear_time, total_locomotive_time, total_wagon_time};
use crate::variate::{Distribution, Sampler};

/// Sized equipment and time totals of one station after a step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StationState {
    pub eq: f64,
    pub et: f64,
    pub locomotives: u32,
    pub gear: u32,
    pub total_wagon_time: f64,
    pub total_locomotive_time: f64,
    pub total_gear_time: f64,
}

impl StationState {
    fn baseline(locomotives: u32, gear: u32) -> Self {
        StationState {
            eq: 0.0,
            et: 0.0,
            locomotives: locomotives.max(1),
            gear: gear.max(1),
            total_wagon_time: 0.0,
            total_locomotive_time: 0.0,
            total_gear_time: 0.0,
        }
    }
}

/// Complete per-station and per-link state produced by one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepSnapshot {
    pub stations: BTreeMap<StationId, StationState>,
    pub link_loads: BTreeMap<LinkId, f64>,
}

impl StepSnapshot {
    pub fn total_locomotives(&self) -> u64 {
        self.stations.values().map(|s| u64::from(s.locomotives)).sum()
    }

    pub fn total_gear(&self) -> u64 {
        self.stations.values().map(|s| u64::from(s.gear)).sum()
    }
}

pub struct TransportModel {
    config: ModelConfig,
    solver: Box<dyn RootSolver>,
    state: StepSnapshot,
    steps: u64,
}

impl TransportModel {
    /// Create a model whose facility counts start at the provider's
    /// baseline equipment.
    pub fn new(config: ModelConfig, provider: &dyn FlowProvider) -> Result<Self> {
        Self::with_solver(config, provider, Box::new(BisectionSolver::default()))
    }

    pub fn with_solver(
        config: ModelConfig,
        provider: &dyn FlowProvider,
        solver: Box<dyn RootSolver>,
    ) -> Result<Self> {
        config.validate()?;
        let stations = provider
            .stations()
            .iter()
            .map(|s| {
                (
                    s.id,
                    StationState::baseline(s.baseline_locomotives, s.baseline_gear),
                )
            })
            .collect();
        let link_loads = provider.links().iter().map(|l| (l.id, l.load)).collect();
        Ok(TransportModel {
            config,
            solver,
            state: StepSnapshot {
                stations,
                link_loads,
            },
            steps: 0,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn state(&self) -> &StepSnapshot {
        &self.state
    }

    pub fn station(&self, id: StationId) -> Option<&StationState> {
        self.state.stations.get(&id)
    }

    /// Number of completed simulation steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn sizer(&self) -> FacilitySizer<'_> {
        FacilitySizer::new(&self.config, self.solver.as_ref())
    }

    /// Simulate one pass over the whole network: resample flows, size and
    /// aggregate every station, then snapshot link loads.
    ///
    /// Draws happen in a fixed order: one inter-arrival draw per link, then
    /// one batch-size draw per station. On error both the model state and
    /// the provider's flows are left as they were before the call.
    pub fn simulate_step(
        &mut self,
        provider: &mut dyn FlowProvider,
        inter_arrival: &Distribution,
        batch_size: &Distribution,
        sampler: &mut dyn Sampler,
    ) -> Result<()> {
        let saved = provider.save_flows();
        let state = match self.next_state(provider, inter_arrival, batch_size, sampler) {
            Ok(state) => state,
            Err(err) => {
                provider.restore_flows(saved);
                return Err(err);
            }
        };

        self.state = state;
        self.steps += 1;
        debug!(
            step = self.steps,
            locomotives = self.state.total_locomotives(),
            gear = self.state.total_gear(),
            "simulation step complete"
        );
        Ok(())
    }

    fn next_state(
        &self,
        provider: &mut dyn FlowProvider,
        inter_arrival: &Distribution,
        batch_size: &Distribution,
        sampler: &mut dyn Sampler,
    ) -> Result<StepSnapshot> {
        provider.resample_flows(inter_arrival, sampler)?;
        provider.recompute_loads();

        let sizer = self.sizer();
        let service_time = self.config.mean_service_time;
        let mut stations = BTreeMap::new();
        for station in provider.stations() {
            let eq = sampler.sample(batch_size) / self.config.locomotive_capacity;
            let et = 1.0 / (station.inbound_intensity * self.config.mean_delivery_time);
            check_ratios(eq, et).map_err(|mut err| {
                err.details = Some(format!(
                    "station {} ({}): EQ={eq}, ET={et}",
                    station.code, station.name
                ));
                err
            })?;

            let locomotives = sizer.size_locomotives(eq, et)?;
            let gear = sizer.size_gear(eq, et, locomotives);
            let load = StationLoad {
                eq,
                et,
                locomotives,
                gear,
                service_time,
            };
            stations.insert(
                station.id,
                StationState {
                    eq,
                    et,
                    locomotives,
                    gear,
                    total_wagon_time: total_wagon_time(&load),
                    total_locomotive_time: total_locomotive_time(&load),
                    total_gear_time: total_gear_time(&load),
                },
            );
        }

        let link_loads = provider.links().iter().map(|l| (l.id, l.load)).collect();
        Ok(StepSnapshot {
            stations,
            link_loads,
        })
    }
}
