// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Closed-form daily time totals for a sized station.

/// Inputs shared by the three totals.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StationLoad {
    pub eq: f64,
    pub et: f64,
    pub locomotives: u32,
    pub gear: u32,
    /// Mean service time of one wagon at the freight front, hours.
    pub service_time: f64,
}

/// Total wagon time: dwell waiting for gear, dwell waiting for
/// locomotives, the gear/service interaction, and per-batch overhead.
pub fn total_wagon_time(s: &StationLoad) -> f64 {
    let ln = f64::from(s.locomotives);
    let gn = f64::from(s.gear);
    2172.0 * s.eq.powf(2.527) * ln.powf(-0.429) * s.et.powf(-1.979)
        + 104.0 * s.eq.powf(1.054) * s.et.powf(-0.961)
        + 48704.0
            * ln.powf(0.305)
            * s.eq.powf(2.982)
            * s.service_time.powf(1.129)
            * s.et.powf(-2.698)
            * gn.powf(-2.368)
        + 123.0 * s.service_time
}

/// Total locomotive time, at least 24 hours per locomotive.
pub fn total_locomotive_time(s: &StationLoad) -> f64 {
    let ln = f64::from(s.locomotives);
    let estimate = 90.0 * ln.powf(0.664) * s.et.powf(-0.885);
    estimate.max(24.0 * ln)
}

/// Total gear time, at least 24 hours per gear unit.
pub fn total_gear_time(s: &StationLoad) -> f64 {
    (123.0 * s.service_time).max(24.0 * f64::from(s.gear))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn load(eq: f64, et: f64, locomotives: u32, gear: u32) -> StationLoad {
        StationLoad {
            eq,
            et,
            locomotives,
            gear,
            service_time: 0.3,
        }
    }

    #[test]
    fn test_known_station_totals() {
        let s = load(1.0, 0.5, 13, 15);
        assert!((total_wagon_time(&s) - 3379.703953387606).abs() < 1e-6);
        assert!((total_locomotive_time(&s) - 912.6671971999475).abs() < 1e-6);
        assert_eq!(total_gear_time(&s), 360.0);
    }

    #[test]
    fn test_floors_apply_to_light_stations() {
        let s = load(0.6, 5.0, 1, 1);
        assert_eq!(total_locomotive_time(&s), 24.0);
        assert!((total_gear_time(&s) - 36.9).abs() < 1e-12);
        assert!((total_wagon_time(&s) - 110.01331524200145).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_locomotive_and_gear_floors(
            eq in 0.01f64..5.0,
            et in 0.01f64..50.0,
            ln in 1u32..100,
            gn in 1u32..100,
        ) {
            let s = load(eq, et, ln, gn);
            prop_assert!(total_locomotive_time(&s) >= 24.0 * f64::from(ln));
            prop_assert!(total_gear_time(&s) >= 24.0 * f64::from(gn));
            prop_assert!(total_wagon_time(&s) > 0.0);
        }
    }
}
