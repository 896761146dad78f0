// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Finite-difference estimate of the return on facility investment.
//!
//! Two simulation steps are run back to back under the same distributions.
//! The change in equipment between them prices an investment (`Kres`), and
//! the change in operating times and link loads prices what that
//! investment buys. The ratio gives the four objective coefficients of the
//! allocation program.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::common::Result;
use crate::config::{ModelConfig, Sc3Formula};
use crate::model::{StepSnapshot, TransportModel};
use crate::network::FlowProvider;
use crate::variate::{Distribution, Sampler};
use crate::{network_err, opt_err};

/// Load value per unit of weighted link load in `sc1`.
const LOAD_VALUE: f64 = 9500.0;
/// Wagon-hours per unit of load and locomotive capacity in `sc3`
/// (100·24/50).
const LOAD_WAGON_HOURS: f64 = 48.0;

/// Before-minus-after differences between two steps, summed over the
/// network.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Deltas {
    pub locomotives: i64,
    pub gear: i64,
    pub wagon_time: f64,
    pub locomotive_time: f64,
    pub gear_time: f64,
    /// Weighted link load.
    pub load: f64,
}

impl Deltas {
    pub fn between(
        before: &StepSnapshot,
        after: &StepSnapshot,
        provider: &dyn FlowProvider,
    ) -> Result<Self> {
        let mut d = Deltas::default();
        for (id, b) in before.stations.iter() {
            let Some(a) = after.stations.get(id) else {
                return network_err!(DoesNotExist, format!("station {id} missing from second step"));
            };
            d.locomotives += i64::from(b.locomotives) - i64::from(a.locomotives);
            d.gear += i64::from(b.gear) - i64::from(a.gear);
            d.wagon_time += b.total_wagon_time - a.total_wagon_time;
            d.locomotive_time += b.total_locomotive_time - a.total_locomotive_time;
            d.gear_time += b.total_gear_time - a.total_gear_time;
        }

        let weights: HashMap<_, _> = provider.links().iter().map(|l| (l.id, l.weight)).collect();
        for (id, load_before) in before.link_loads.iter() {
            let (Some(load_after), Some(weight)) = (after.link_loads.get(id), weights.get(id))
            else {
                return network_err!(DoesNotExist, format!("link {id} missing from second step"));
            };
            d.load += (load_before - load_after) * weight;
        }
        Ok(d)
    }

    /// Capital outlay implied by the positive equipment deltas.
    pub fn investment(&self, config: &ModelConfig) -> f64 {
        let mut investment = 0.0;
        if self.locomotives > 0 {
            investment += self.locomotives as f64 * config.costs.locomotive_capital;
        }
        if self.gear > 0 {
            investment += self.gear as f64 * config.costs.gear_capital;
        }
        investment
    }
}

/// Objective coefficients of the allocation program.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Estimate {
    pub deltas: Deltas,
    pub investment: f64,
    /// Operating savings, load value, fixed reserve weight, wagon savings.
    pub coefficients: [f64; 4],
}

impl Estimate {
    pub fn from_deltas(deltas: Deltas, config: &ModelConfig) -> Self {
        let c = &config.costs;
        let k = deltas.investment(config);
        let sc0 = (deltas.locomotive_time * c.locomotive_run + deltas.gear_time * c.gear_operation) / k;
        let sc1 = LOAD_VALUE * deltas.load / k;
        let load_term = LOAD_WAGON_HOURS * config.locomotive_capacity * deltas.load;
        let sc3 = match config.sc3_formula {
            Sc3Formula::DwellAndLoad => {
                (deltas.wagon_time * (c.wagon_loaded + c.wagon_empty) / 2.0 + load_term) / k
            }
            Sc3Formula::LoadOnly => load_term / k,
        };
        Estimate {
            deltas,
            investment: k,
            coefficients: [sc0, sc1, 1.0, sc3],
        }
    }

    /// A usable estimate has a positive, finite operating coefficient.
    /// Zero investment makes it infinite or NaN.
    pub fn is_valid(&self) -> bool {
        let sc0 = self.coefficients[0];
        sc0 > 0.0 && sc0.is_finite()
    }

    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            opt_err!(
                DegenerateSample,
                format!(
                    "sc0={} with investment {}",
                    self.coefficients[0], self.investment
                )
            )
        }
    }
}

/// Run two consecutive steps and difference them. Never retries.
pub fn estimate(
    model: &mut TransportModel,
    provider: &mut dyn FlowProvider,
    inter_arrival: &Distribution,
    batch_size: &Distribution,
    sampler: &mut dyn Sampler,
) -> Result<Estimate> {
    model.simulate_step(provider, inter_arrival, batch_size, sampler)?;
    let before = model.state().clone();
    model.simulate_step(provider, inter_arrival, batch_size, sampler)?;
    let deltas = Deltas::between(&before, model.state(), provider)?;
    Ok(Estimate::from_deltas(deltas, model.config()))
}

/// Repeat `estimate` until it is valid, up to the configured attempt cap.
pub fn estimate_until_valid(
    model: &mut TransportModel,
    provider: &mut dyn FlowProvider,
    inter_arrival: &Distribution,
    batch_size: &Distribution,
    sampler: &mut dyn Sampler,
) -> Result<Estimate> {
    let max_attempts = model.config().retry.max_attempts;
    for attempt in 1..=max_attempts {
        match estimate(model, provider, inter_arrival, batch_size, sampler)?.validate() {
            Ok(estimate) => return Ok(estimate),
            Err(err) => trace!(attempt, %err, "rejected sensitivity sample"),
        }
    }
    warn!(max_attempts, "no improving sample found");
    opt_err!(
        NoImprovingSample,
        format!("no valid sensitivity sample in {max_attempts} attempts")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    fn deltas() -> Deltas {
        Deltas {
            locomotives: 2,
            gear: -1,
            wagon_time: 100.0,
            locomotive_time: 50.0,
            gear_time: 10.0,
            load: 0.5,
        }
    }

    #[test]
    fn test_coefficients_by_hand() {
        let config = ModelConfig::default();
        let est = Estimate::from_deltas(deltas(), &config);
        // only the locomotive delta is positive
        assert_eq!(est.investment, 20_000.0);
        let [sc0, sc1, sc2, sc3] = est.coefficients;
        assert!((sc0 - (50.0 * 120.0 + 10.0 * 80.0) / 20_000.0).abs() < 1e-12);
        assert!((sc1 - 9500.0 * 0.5 / 20_000.0).abs() < 1e-12);
        assert_eq!(sc2, 1.0);
        assert!((sc3 - (100.0 * 60.0 / 2.0 + 48.0 * 10.0 * 0.5) / 20_000.0).abs() < 1e-12);
        assert!(est.is_valid());
    }

    #[test]
    fn test_load_only_sc3() {
        let config = ModelConfig {
            sc3_formula: Sc3Formula::LoadOnly,
            ..ModelConfig::default()
        };
        let est = Estimate::from_deltas(deltas(), &config);
        assert!((est.coefficients[3] - 48.0 * 10.0 * 0.5 / 20_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_investment_is_invalid() {
        let config = ModelConfig::default();
        let d = Deltas {
            locomotives: 0,
            gear: -2,
            ..deltas()
        };
        let est = Estimate::from_deltas(d, &config);
        assert_eq!(est.investment, 0.0);
        assert!(est.coefficients[0].is_infinite());
        assert!(!est.is_valid());
        assert_eq!(est.validate().unwrap_err().code, ErrorCode::DegenerateSample);
    }

    #[test]
    fn test_zero_over_zero_is_invalid() {
        let est = Estimate::from_deltas(Deltas::default(), &ModelConfig::default());
        assert!(est.coefficients[0].is_nan());
        assert!(!est.is_valid());
    }

    #[test]
    fn test_non_improving_sample_is_invalid() {
        let d = Deltas {
            locomotive_time: -50.0,
            gear_time: -10.0,
            ..deltas()
        };
        let est = Estimate::from_deltas(d, &ModelConfig::default());
        assert!(est.coefficients[0] < 0.0);
        assert!(!est.is_valid());
    }
}
