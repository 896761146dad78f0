// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Batch sweep of the sensitivity estimate over a grid of inter-arrival
//! scales and batch-size locations.

use std::io::Write;

use serde::Serialize;
use tracing::info;

use crate::common::Result;
use crate::config::ExperimentConfig;
use crate::model::TransportModel;
use crate::network::FlowProvider;
use crate::sensitivity::estimate_until_valid;
use crate::variate::{Distribution, Sampler};

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ExperimentRow {
    pub intensity_scale: f64,
    pub batch_location: f64,
    pub sc0: f64,
    pub sc1: f64,
    pub sc3: f64,
}

/// Values visited by `for (x = min; x <= max; x += (max - min) / steps)`
/// with the increment accumulated in f64, so the upper bound is only
/// included when the accumulated value does not overshoot it.
pub fn grid_values(min: f64, max: f64, steps: u32) -> Vec<f64> {
    let increment = (max - min) / f64::from(steps);
    if !(increment > 0.0) {
        return vec![min];
    }
    let mut values = Vec::new();
    let mut x = min;
    while x <= max {
        values.push(x);
        let next = x + increment;
        if next == x {
            break;
        }
        x = next;
    }
    values
}

/// Inter-arrival distribution of a grid cell: the configured law with its
/// scale replaced.
pub fn inter_arrival_for(base: &Distribution, scale: f64) -> Distribution {
    Distribution { scale, ..*base }
}

/// Batch-size distribution of a grid cell: location `q`, scale `q/5`.
pub fn batch_size_for(base: &Distribution, location: f64) -> Distribution {
    Distribution {
        location,
        scale: location / 5.0,
        ..*base
    }
}

/// Run the sweep, writing one tab-separated row per valid estimate.
/// Returns the number of rows written. The writer is flushed on success
/// and dropped on every exit path.
pub fn run_experiment<W: Write>(
    model: &mut TransportModel,
    provider: &mut dyn FlowProvider,
    sampler: &mut dyn Sampler,
    config: &ExperimentConfig,
    writer: W,
) -> Result<usize> {
    config.validate()?;
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(config.header)
        .from_writer(writer);

    let base_inter_arrival = model.config().inter_arrival;
    let base_batch_size = model.config().batch_size;
    let intensity_scales = grid_values(
        config.min_intensity_scale,
        config.max_intensity_scale,
        config.steps,
    );
    let batch_locations = grid_values(
        config.min_batch_location,
        config.max_batch_location,
        config.steps,
    );

    let mut rows = 0;
    for &i in intensity_scales.iter() {
        for &q in batch_locations.iter() {
            info!(intensity_scale = i, batch_location = q, "experiment cell");
            let inter_arrival = inter_arrival_for(&base_inter_arrival, i);
            let batch_size = batch_size_for(&base_batch_size, q);
            for _ in 0..config.repetitions {
                let estimate =
                    estimate_until_valid(model, provider, &inter_arrival, &batch_size, sampler)?;
                let [sc0, sc1, _, sc3] = estimate.coefficients;
                out.serialize(ExperimentRow {
                    intensity_scale: i,
                    batch_location: q,
                    sc0,
                    sc1,
                    sc3,
                })?;
                rows += 1;
            }
        }
    }
    out.flush()?;
    info!(rows, "experiment complete");
    Ok(rows)
}
