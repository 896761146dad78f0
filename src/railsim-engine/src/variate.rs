// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Stochastic variates used by the simulation step.
//!
//! A `Distribution` is plain data (law, location, scale) and is passed into
//! every call that draws from it, so the same sampler can serve the
//! inter-arrival and batch-size distributions of a sweep cell without any
//! mutable configuration living on the model.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Law {
    /// Gaussian with mean `location` and standard deviation `scale`.
    Normal,
    /// `location` plus an exponential variate with mean `scale`.
    Exponential,
    /// Uniform over `[location, location + scale)`.
    Uniform,
    /// Always `location`.
    Constant,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub law: Law,
    #[serde(default)]
    pub location: f64,
    #[serde(default)]
    pub scale: f64,
}

impl Distribution {
    pub fn new(law: Law, location: f64, scale: f64) -> Self {
        Distribution {
            law,
            location,
            scale,
        }
    }

    pub fn normal(location: f64, scale: f64) -> Self {
        Self::new(Law::Normal, location, scale)
    }

    pub fn exponential(scale: f64) -> Self {
        Self::new(Law::Exponential, 0.0, scale)
    }

    pub fn constant(value: f64) -> Self {
        Self::new(Law::Constant, value, 0.0)
    }

    /// Expected value of a draw.
    pub fn mean(&self) -> f64 {
        match self.law {
            Law::Normal | Law::Constant => self.location,
            Law::Exponential => self.location + self.scale,
            Law::Uniform => self.location + self.scale / 2.0,
        }
    }
}

/// Source of fresh draws. Every call must return a new variate.
pub trait Sampler {
    fn sample(&mut self, dist: &Distribution) -> f64;
}

/// `StdRng`-backed sampler; identical seeds give identical draw sequences.
pub struct SeededSampler {
    rng: StdRng,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        SeededSampler {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw on (0, 1), never exactly zero.
    fn open_unit(&mut self) -> f64 {
        self.rng.random::<f64>().max(f64::MIN_POSITIVE)
    }

    /// Sample from the standard normal distribution using the Box-Muller transform.
    fn standard_normal(&mut self) -> f64 {
        let u1 = self.open_unit();
        let u2: f64 = self.rng.random();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

impl Sampler for SeededSampler {
    fn sample(&mut self, dist: &Distribution) -> f64 {
        match dist.law {
            Law::Normal => dist.location + dist.scale * self.standard_normal(),
            Law::Exponential => dist.location - dist.scale * self.open_unit().ln(),
            Law::Uniform => dist.location + dist.scale * self.rng.random::<f64>(),
            Law::Constant => dist.location,
        }
    }
}

/// Replays a recorded list of draws in order, cycling back to the start
/// when the list is exhausted. The distribution argument is ignored.
#[derive(Clone, Debug)]
pub struct ReplaySampler {
    draws: Vec<f64>,
    next: usize,
}

impl ReplaySampler {
    /// # Panics
    ///
    /// Panics if `draws` is empty.
    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "replay sampler needs at least one draw");
        ReplaySampler { draws, next: 0 }
    }

    /// Number of draws handed out so far.
    pub fn consumed(&self) -> usize {
        self.next
    }
}

impl Sampler for ReplaySampler {
    fn sample(&mut self, _dist: &Distribution) -> f64 {
        let value = self.draws[self.next % self.draws.len()];
        self.next += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let dist = Distribution::normal(3.0, 0.6);
        let mut a = SeededSampler::new(42);
        let mut b = SeededSampler::new(42);
        for _ in 0..32 {
            assert_eq!(a.sample(&dist), b.sample(&dist));
        }
    }

    #[test]
    fn test_seeded_sampler_draws_fresh_values() {
        let dist = Distribution::exponential(0.3);
        let mut sampler = SeededSampler::new(7);
        let first = sampler.sample(&dist);
        let second = sampler.sample(&dist);
        assert_ne!(first, second);
    }

    #[test]
    fn test_exponential_is_positive_and_near_mean() {
        let dist = Distribution::exponential(0.5);
        let mut sampler = SeededSampler::new(1);
        let n = 20_000;
        let mut total = 0.0;
        for _ in 0..n {
            let x = sampler.sample(&dist);
            assert!(x > 0.0 && x.is_finite());
            total += x;
        }
        let mean = total / n as f64;
        assert!((mean - 0.5).abs() < 0.03, "sample mean {mean}");
    }

    #[test]
    fn test_normal_sample_mean() {
        let dist = Distribution::normal(5.0, 1.0);
        let mut sampler = SeededSampler::new(3);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| sampler.sample(&dist)).sum();
        let mean = total / n as f64;
        assert!((mean - 5.0).abs() < 0.05, "sample mean {mean}");
    }

    #[test]
    fn test_uniform_and_constant_ranges() {
        let mut sampler = SeededSampler::new(9);
        let uniform = Distribution::new(Law::Uniform, 2.0, 3.0);
        for _ in 0..1000 {
            let x = sampler.sample(&uniform);
            assert!((2.0..5.0).contains(&x));
        }
        assert_eq!(sampler.sample(&Distribution::constant(4.5)), 4.5);
    }

    #[test]
    fn test_replay_sampler_cycles() {
        let dist = Distribution::constant(0.0);
        let mut sampler = ReplaySampler::new(vec![1.0, 2.0, 3.0]);
        let drawn: Vec<f64> = (0..5).map(|_| sampler.sample(&dist)).collect();
        assert_eq!(drawn, vec![1.0, 2.0, 3.0, 1.0, 2.0]);
        assert_eq!(sampler.consumed(), 5);
    }

    #[test]
    fn test_distribution_json_shape() {
        let dist: Distribution =
            serde_json::from_str(r#"{"law": "exponential", "scale": 0.3}"#).unwrap();
        assert_eq!(dist, Distribution::exponential(0.3));
        assert!((dist.mean() - 0.3).abs() < f64::EPSILON);
    }
}
