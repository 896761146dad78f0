// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Benchmarks for facility sizing and a full simulation step.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use railsim_engine::{
    BisectionSolver, Distribution, FacilitySizer, ModelConfig, RailNetwork, SeededSampler,
    TransportModel,
};

fn bench_size_locomotives(c: &mut Criterion) {
    let config = ModelConfig::default();
    let solver = BisectionSolver::default();
    let sizer = FacilitySizer::new(&config, &solver);

    c.bench_function("size_locomotives/interior_root", |b| {
        b.iter(|| {
            sizer
                .size_locomotives(black_box(1.0), black_box(0.5))
                .expect("sizing should succeed")
        });
    });
    c.bench_function("size_locomotives/bound_optimum", |b| {
        b.iter(|| {
            sizer
                .size_locomotives(black_box(0.6), black_box(5.0))
                .expect("sizing should succeed")
        });
    });
}

fn bench_simulate_step(c: &mut Criterion) {
    let mut net = RailNetwork::new();
    let mut prev = None;
    for code in 0..20 {
        let id = net
            .add_station(code, &format!("Station {code}"), 5.0)
            .expect("station should be added");
        if let Some(from) = prev {
            net.add_link(from, id, 1.0).expect("link should be added");
        }
        prev = Some(id);
    }
    let config = ModelConfig::default();
    // wide enough margin that a negative batch is never drawn
    let (ia, bs) = (config.inter_arrival, Distribution::normal(6.0, 0.6));
    let mut model = TransportModel::new(config, &net).expect("model should build");
    let mut sampler = SeededSampler::new(0);

    c.bench_function("simulate_step/chain_20", |b| {
        b.iter(|| {
            model
                .simulate_step(&mut net, &ia, &bs, &mut sampler)
                .expect("step should succeed")
        });
    });
}

criterion_group!(benches, bench_size_locomotives, bench_simulate_step);
criterion_main!(benches);
