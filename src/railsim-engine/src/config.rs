// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::config_err;
use crate::variate::Distribution;

/// Unit costs, in currency units per hour unless noted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostConstants {
    /// Idle cost of a loaded wagon.
    pub wagon_loaded: f64,
    /// Idle cost of an empty wagon.
    pub wagon_empty: f64,
    /// Operating cost of one material-handling gear unit.
    pub gear_operation: f64,
    /// Locomotive cost while waiting for wagons.
    pub locomotive_idle: f64,
    /// Locomotive cost while moving wagon groups.
    pub locomotive_run: f64,
    /// Capital cost of one locomotive.
    pub locomotive_capital: f64,
    /// Capital cost of one gear unit.
    pub gear_capital: f64,
}

impl CostConstants {
    pub fn primary() -> Self {
        CostConstants {
            wagon_loaded: 50.0,
            wagon_empty: 10.0,
            gear_operation: 80.0,
            locomotive_idle: 60.0,
            locomotive_run: 120.0,
            locomotive_capital: 10_000.0,
            gear_capital: 2_000.0,
        }
    }

    /// Constants of the second calibration of the model, kept selectable
    /// rather than merged into the primary set.
    pub fn alternate() -> Self {
        CostConstants {
            wagon_loaded: 100.0,
            wagon_empty: 10.0,
            gear_operation: 100.0,
            locomotive_idle: 80.0,
            locomotive_run: 120.0,
            locomotive_capital: 1_000.0,
            gear_capital: 500.0,
        }
    }
}

impl Default for CostConstants {
    fn default() -> Self {
        Self::primary()
    }
}

/// How a continuous equipment estimate becomes an integer count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    #[default]
    Floor,
    Round,
    Ceil,
}

impl Rounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::Floor => value.floor(),
            Rounding::Round => value.round(),
            Rounding::Ceil => value.ceil(),
        }
    }
}

/// Which terms make up the wagon coefficient `sc3`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sc3Formula {
    /// Wagon dwell savings plus the network load term.
    #[default]
    DwellAndLoad,
    /// Network load term only.
    LoadOnly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverBounds {
    pub low: f64,
    pub high: f64,
    pub accuracy: f64,
}

impl Default for SolverBounds {
    fn default() -> Self {
        SolverBounds {
            low: 1.0,
            high: 100.0,
            accuracy: 0.001,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Sensitivity estimates attempted before giving up.
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_attempts: 1000 }
    }
}

/// Parameters of the transport model. Missing JSON fields take their
/// defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub costs: CostConstants,
    /// Wagons one locomotive moves per trip.
    pub locomotive_capacity: f64,
    /// Mean service time of one wagon at the freight front, hours.
    pub mean_service_time: f64,
    /// Mean time to deliver one wagon to the freight front, hours.
    pub mean_delivery_time: f64,
    /// Gear count assumed by the first locomotive solve.
    pub initial_gear_guess: u32,
    /// Leading constant of the gear term in the first locomotive solve.
    pub first_lead: f64,
    /// Leading constant of the gear term in the refined locomotive solve.
    pub second_lead: f64,
    pub solver: SolverBounds,
    pub rounding: Rounding,
    pub sc3_formula: Sc3Formula,
    /// Lower bound on every allocation share.
    pub min_share: f64,
    pub retry: RetryPolicy,
    pub inter_arrival: Distribution,
    pub batch_size: Distribution,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            costs: CostConstants::primary(),
            locomotive_capacity: 10.0,
            mean_service_time: 0.3,
            mean_delivery_time: 0.1,
            initial_gear_guess: 5,
            first_lead: 14855.0,
            second_lead: 14885.0,
            solver: SolverBounds::default(),
            rounding: Rounding::Floor,
            sc3_formula: Sc3Formula::DwellAndLoad,
            min_share: 0.1,
            retry: RetryPolicy::default(),
            inter_arrival: Distribution::exponential(0.3),
            batch_size: Distribution::normal(3.0, 0.6),
        }
    }
}

impl ModelConfig {
    pub fn alternate() -> Self {
        ModelConfig {
            costs: CostConstants::alternate(),
            batch_size: Distribution::normal(5.0, 1.0),
            ..ModelConfig::default()
        }
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let config: ModelConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("locomotive_capacity", self.locomotive_capacity),
            ("mean_service_time", self.mean_service_time),
            ("mean_delivery_time", self.mean_delivery_time),
            ("first_lead", self.first_lead),
            ("second_lead", self.second_lead),
            ("solver.accuracy", self.solver.accuracy),
            ("solver.low", self.solver.low),
            ("costs.wagon_loaded", self.costs.wagon_loaded),
            ("costs.wagon_empty", self.costs.wagon_empty),
            ("costs.gear_operation", self.costs.gear_operation),
            ("costs.locomotive_idle", self.costs.locomotive_idle),
            ("costs.locomotive_run", self.costs.locomotive_run),
            ("costs.locomotive_capital", self.costs.locomotive_capital),
            ("costs.gear_capital", self.costs.gear_capital),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return config_err!(BadConfig, format!("{name} must be positive, got {value}"));
            }
        }
        if self.solver.high <= self.solver.low {
            return config_err!(
                BadConfig,
                format!(
                    "solver range [{}, {}] is empty",
                    self.solver.low, self.solver.high
                )
            );
        }
        if self.initial_gear_guess == 0 {
            return config_err!(BadConfig, "initial_gear_guess must be at least 1".to_string());
        }
        if self.retry.max_attempts == 0 {
            return config_err!(BadConfig, "retry.max_attempts must be at least 1".to_string());
        }
        if !(0.0..=0.25).contains(&self.min_share) {
            return config_err!(
                BadConfig,
                format!("min_share {} leaves no feasible allocation", self.min_share)
            );
        }
        Ok(())
    }
}

/// Bounds of the batch parameter sweep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub min_intensity_scale: f64,
    pub max_intensity_scale: f64,
    pub min_batch_location: f64,
    pub max_batch_location: f64,
    /// Number of increments between the min and max of each axis.
    pub steps: u32,
    /// Valid samples recorded per grid cell.
    pub repetitions: usize,
    /// Write a header line before the rows.
    pub header: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            min_intensity_scale: 0.2,
            max_intensity_scale: 1.2,
            min_batch_location: 3.0,
            max_batch_location: 10.0,
            steps: 3,
            repetitions: 100,
            header: false,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return config_err!(BadConfig, "experiment steps must be at least 1".to_string());
        }
        if self.max_intensity_scale < self.min_intensity_scale
            || self.max_batch_location < self.min_batch_location
        {
            return config_err!(BadConfig, "experiment bounds are inverted".to_string());
        }
        let axes = [
            ("intensity scale", self.min_intensity_scale, self.max_intensity_scale),
            ("batch location", self.min_batch_location, self.max_batch_location),
        ];
        for (name, min, max) in axes {
            if !(min > 0.0 && max.is_finite()) {
                return config_err!(
                    BadConfig,
                    format!("{name} bounds [{min}, {max}] must be positive and finite")
                );
            }
            // an increment below the float spacing at `min` never advances
            let increment = (max - min) / f64::from(self.steps);
            if max > min && min + increment == min {
                return config_err!(
                    BadConfig,
                    format!("{name} step {increment} is too fine to move past {min}")
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::variate::Law;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();

        assert!((config.locomotive_capacity - 10.0).abs() < f64::EPSILON);
        assert!((config.mean_service_time - 0.3).abs() < f64::EPSILON);
        assert!((config.mean_delivery_time - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.initial_gear_guess, 5);
        assert!((config.first_lead - 14855.0).abs() < f64::EPSILON);
        assert!((config.second_lead - 14885.0).abs() < f64::EPSILON);
        assert_eq!(config.rounding, Rounding::Floor);
        assert_eq!(config.sc3_formula, Sc3Formula::DwellAndLoad);
        assert_eq!(config.retry.max_attempts, 1000);
        assert_eq!(config.inter_arrival.law, Law::Exponential);
        assert_eq!(config.batch_size, Distribution::normal(3.0, 0.6));
        assert_eq!(config.costs, CostConstants::primary());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_alternate_calibration() {
        let config = ModelConfig::alternate();
        assert!((config.costs.wagon_loaded - 100.0).abs() < f64::EPSILON);
        assert!((config.costs.locomotive_capital - 1000.0).abs() < f64::EPSILON);
        assert!((config.costs.gear_capital - 500.0).abs() < f64::EPSILON);
        assert_eq!(config.batch_size, Distribution::normal(5.0, 1.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rounding_modes() {
        assert_eq!(Rounding::Floor.apply(2.7), 2.0);
        assert_eq!(Rounding::Round.apply(2.5), 3.0);
        assert_eq!(Rounding::Ceil.apply(2.1), 3.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"rounding": "ceil", "retry": {"max_attempts": 5}}"#;
        let config = ModelConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(config.rounding, Rounding::Ceil);
        assert_eq!(config.retry.max_attempts, 5);
        assert!((config.locomotive_capacity - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ModelConfig {
            locomotive_capacity: 0.0,
            ..ModelConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().code, ErrorCode::BadConfig);

        let config = ModelConfig {
            solver: SolverBounds {
                low: 5.0,
                high: 5.0,
                accuracy: 0.001,
            },
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ModelConfig {
            min_share: 0.3,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ModelConfig {
            retry: RetryPolicy { max_attempts: 0 },
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_experiment_defaults_and_validation() {
        let exp = ExperimentConfig::default();
        assert_eq!(exp.steps, 3);
        assert_eq!(exp.repetitions, 100);
        assert!(!exp.header);
        assert!(exp.validate().is_ok());

        let bad = ExperimentConfig {
            steps: 0,
            ..ExperimentConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_experiment_step_below_float_spacing() {
        let exp = ExperimentConfig {
            min_intensity_scale: 1e17,
            max_intensity_scale: 1e17 + 16.0,
            ..ExperimentConfig::default()
        };
        assert_eq!(exp.validate().unwrap_err().code, ErrorCode::BadConfig);

        let single_point = ExperimentConfig {
            min_batch_location: 4.0,
            max_batch_location: 4.0,
            ..ExperimentConfig::default()
        };
        assert!(single_point.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_costs() {
        let json = r#"{"costs": {"wagon_loaded": 50, "wagon_empty": 10, "gear_operation": -80,
            "locomotive_idle": 60, "locomotive_run": 120, "locomotive_capital": 10000,
            "gear_capital": 2000}}"#;
        let err = ModelConfig::from_reader(json.as_bytes()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadConfig);
        assert!(err.details.unwrap().contains("gear_operation"));

        let config = ModelConfig {
            costs: CostConstants {
                locomotive_capital: 0.0,
                ..CostConstants::primary()
            },
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
