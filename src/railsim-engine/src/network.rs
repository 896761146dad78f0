// Copyright 2026 The Railsim Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Rail network topology and flow resampling.
//!
//! Stations and links live in an arena and are referred to by `StationId`
//! and `LinkId` handles; every per-entity map elsewhere in the engine is
//! keyed by these handles.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::variate::{Distribution, Sampler};
use crate::{network_err, sim_err};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(u32);

impl StationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u32);

impl LinkId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    pub id: StationId,
    /// External station code.
    pub code: u32,
    pub name: String,
    /// Wagon-group arrivals per hour originating at the station itself.
    pub local_intensity: f64,
    /// Total arrivals per hour, local plus every inbound link's flow.
    pub inbound_intensity: f64,
    /// Installed locomotives before any simulation.
    pub baseline_locomotives: u32,
    /// Installed gear units before any simulation.
    pub baseline_gear: u32,
}

/// A directed link between two stations.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub from: StationId,
    pub to: StationId,
    pub weight: f64,
    /// Wagon-group arrivals per hour carried by the link.
    pub flow: f64,
    pub load: f64,
}

/// The network collaborator the simulation step drives.
pub trait FlowProvider {
    fn stations(&self) -> &[Station];
    fn links(&self) -> &[Link];
    /// Draw new link flows from `inter_arrival` and refresh each station's
    /// inbound intensity. Either every flow is replaced or none is.
    fn resample_flows(
        &mut self,
        inter_arrival: &Distribution,
        sampler: &mut dyn Sampler,
    ) -> Result<()>;
    /// Recompute link loads from the current flows.
    fn recompute_loads(&mut self);
    fn link_between(&self, from: StationId, to: StationId) -> Option<LinkId>;
    /// Capture everything `resample_flows` and `recompute_loads` change.
    fn save_flows(&self) -> FlowState;
    /// Put back a state taken by `save_flows`.
    fn restore_flows(&mut self, state: FlowState);
}

/// Per-link flow and load, in link order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowState {
    pub flows: Vec<f64>,
    pub loads: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct RailNetwork {
    stations: Vec<Station>,
    links: Vec<Link>,
    by_code: HashMap<u32, StationId>,
    by_endpoints: BTreeMap<(StationId, StationId), LinkId>,
}

impl RailNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_station(&mut self, code: u32, name: &str, local_intensity: f64) -> Result<StationId> {
        if self.by_code.contains_key(&code) {
            return network_err!(DuplicateStation, format!("station code {code} already exists"));
        }
        if !(local_intensity >= 0.0 && local_intensity.is_finite()) {
            return network_err!(
                BadNetwork,
                format!("station {code} has invalid intensity {local_intensity}")
            );
        }
        let id = StationId(self.stations.len() as u32);
        self.stations.push(Station {
            id,
            code,
            name: name.to_owned(),
            local_intensity,
            inbound_intensity: local_intensity,
            baseline_locomotives: 1,
            baseline_gear: 1,
        });
        self.by_code.insert(code, id);
        Ok(id)
    }

    /// Record the equipment installed at a station before simulation.
    /// Counts below one are raised to one.
    pub fn set_baseline(&mut self, id: StationId, locomotives: u32, gear: u32) -> Result<()> {
        let Some(station) = self.stations.get_mut(id.index()) else {
            return network_err!(DoesNotExist, format!("station {id}"));
        };
        station.baseline_locomotives = locomotives.max(1);
        station.baseline_gear = gear.max(1);
        Ok(())
    }

    pub fn add_link(&mut self, from: StationId, to: StationId, weight: f64) -> Result<LinkId> {
        for end in [from, to] {
            if end.index() >= self.stations.len() {
                return network_err!(DoesNotExist, format!("station {end}"));
            }
        }
        if !weight.is_finite() {
            return network_err!(BadNetwork, format!("link {from}->{to} has weight {weight}"));
        }
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link {
            id,
            from,
            to,
            weight,
            flow: 0.0,
            load: 0.0,
        });
        self.by_endpoints.entry((from, to)).or_insert(id);
        Ok(id)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id.index())
    }

    pub fn station_by_code(&self, code: u32) -> Option<StationId> {
        self.by_code.get(&code).copied()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.index())
    }

    /// Build a network from its JSON description.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let spec: NetworkSpec = serde_json::from_reader(reader)?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &NetworkSpec) -> Result<Self> {
        let mut network = RailNetwork::new();
        for s in spec.stations.iter() {
            let id = network.add_station(s.code, &s.name, s.intensity)?;
            network.set_baseline(id, s.locomotives.unwrap_or(1), s.gear.unwrap_or(1))?;
        }
        for l in spec.links.iter() {
            let (Some(from), Some(to)) = (
                network.station_by_code(l.from),
                network.station_by_code(l.to),
            ) else {
                return network_err!(
                    DoesNotExist,
                    format!("link {}->{} references an unknown station", l.from, l.to)
                );
            };
            network.add_link(from, to, l.weight)?;
        }
        Ok(network)
    }

    fn refresh_inbound(&mut self) {
        for station in self.stations.iter_mut() {
            station.inbound_intensity = station.local_intensity;
        }
        for link in self.links.iter() {
            self.stations[link.to.index()].inbound_intensity += link.flow;
        }
    }
}

impl FlowProvider for RailNetwork {
    fn stations(&self) -> &[Station] {
        &self.stations
    }

    fn links(&self) -> &[Link] {
        &self.links
    }

    fn resample_flows(
        &mut self,
        inter_arrival: &Distribution,
        sampler: &mut dyn Sampler,
    ) -> Result<()> {
        let mut flows = Vec::with_capacity(self.links.len());
        for link in self.links.iter() {
            let interval = sampler.sample(inter_arrival);
            if !(interval > 0.0 && interval.is_finite()) {
                return sim_err!(
                    DegenerateInput,
                    format!("link {} drew inter-arrival interval {interval}", link.id)
                );
            }
            flows.push(1.0 / interval);
        }
        for (link, flow) in self.links.iter_mut().zip(flows) {
            link.flow = flow;
        }
        self.refresh_inbound();
        Ok(())
    }

    fn recompute_loads(&mut self) {
        for link in self.links.iter_mut() {
            link.load = link.flow;
        }
    }

    fn link_between(&self, from: StationId, to: StationId) -> Option<LinkId> {
        self.by_endpoints.get(&(from, to)).copied()
    }

    fn save_flows(&self) -> FlowState {
        FlowState {
            flows: self.links.iter().map(|l| l.flow).collect(),
            loads: self.links.iter().map(|l| l.load).collect(),
        }
    }

    fn restore_flows(&mut self, state: FlowState) {
        for ((link, flow), load) in self.links.iter_mut().zip(state.flows).zip(state.loads) {
            link.flow = flow;
            link.load = load;
        }
        self.refresh_inbound();
    }
}

/// JSON description of a network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub stations: Vec<StationSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationSpec {
    pub code: u32,
    #[serde(default)]
    pub name: String,
    pub intensity: f64,
    #[serde(default)]
    pub locomotives: Option<u32>,
    #[serde(default)]
    pub gear: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: u32,
    pub to: u32,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::variate::ReplaySampler;

    fn line() -> (RailNetwork, StationId, StationId, StationId) {
        let mut net = RailNetwork::new();
        let a = net.add_station(1, "A", 2.0).unwrap();
        let b = net.add_station(2, "B", 1.0).unwrap();
        let c = net.add_station(3, "C", 0.5).unwrap();
        net.add_link(a, b, 1.0).unwrap();
        net.add_link(b, c, 2.0).unwrap();
        (net, a, b, c)
    }

    #[test]
    fn test_duplicate_station_code() {
        let mut net = RailNetwork::new();
        net.add_station(1, "A", 1.0).unwrap();
        let err = net.add_station(1, "A again", 1.0).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateStation);
    }

    #[test]
    fn test_link_between() {
        let (net, a, b, c) = line();
        let ab = net.link_between(a, b).unwrap();
        assert_eq!(net.link(ab).unwrap().weight, 1.0);
        assert!(net.link_between(b, a).is_none());
        assert!(net.link_between(a, c).is_none());
    }

    #[test]
    fn test_resample_sets_flows_and_inbound_intensity() {
        let (mut net, a, b, c) = line();
        let mut sampler = ReplaySampler::new(vec![0.5, 0.25]);
        net.resample_flows(&Distribution::exponential(0.3), &mut sampler)
            .unwrap();
        net.recompute_loads();

        assert_eq!(net.links()[0].flow, 2.0);
        assert_eq!(net.links()[1].flow, 4.0);
        assert_eq!(net.links()[1].load, 4.0);
        assert_eq!(net.station(a).unwrap().inbound_intensity, 2.0);
        assert_eq!(net.station(b).unwrap().inbound_intensity, 3.0);
        assert_eq!(net.station(c).unwrap().inbound_intensity, 4.5);
    }

    #[test]
    fn test_degenerate_interval_leaves_flows_untouched() {
        let (mut net, _, _, _) = line();
        let mut sampler = ReplaySampler::new(vec![0.5, 0.5]);
        net.resample_flows(&Distribution::exponential(0.3), &mut sampler)
            .unwrap();

        let mut bad = ReplaySampler::new(vec![0.25, 0.0]);
        let err = net
            .resample_flows(&Distribution::exponential(0.3), &mut bad)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DegenerateInput);
        assert_eq!(net.links()[0].flow, 2.0);
    }

    #[test]
    fn test_restore_flows_rewinds_resample() {
        let (mut net, _, b, c) = line();
        let mut sampler = ReplaySampler::new(vec![0.5, 0.5]);
        net.resample_flows(&Distribution::exponential(0.3), &mut sampler)
            .unwrap();
        net.recompute_loads();
        let saved = net.save_flows();

        let mut sampler = ReplaySampler::new(vec![0.25, 0.125]);
        net.resample_flows(&Distribution::exponential(0.3), &mut sampler)
            .unwrap();
        net.recompute_loads();
        assert_eq!(net.links()[0].load, 4.0);

        net.restore_flows(saved.clone());
        assert_eq!(net.save_flows(), saved);
        assert_eq!(net.station(b).unwrap().inbound_intensity, 3.0);
        assert_eq!(net.station(c).unwrap().inbound_intensity, 2.5);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "stations": [
                {"code": 10, "name": "Yard", "intensity": 2.0, "locomotives": 3, "gear": 0},
                {"code": 20, "name": "Plant", "intensity": 1.5}
            ],
            "links": [{"from": 10, "to": 20, "weight": 0.5}, {"from": 20, "to": 10}]
        }"#;
        let net = RailNetwork::from_reader(json.as_bytes()).unwrap();
        let yard = net.station_by_code(10).unwrap();
        let plant = net.station_by_code(20).unwrap();
        assert_eq!(net.station(yard).unwrap().baseline_locomotives, 3);
        assert_eq!(net.station(yard).unwrap().baseline_gear, 1);
        assert_eq!(net.station(plant).unwrap().name, "Plant");
        let back = net.link_between(plant, yard).unwrap();
        assert_eq!(net.link(back).unwrap().weight, 1.0);
    }

    #[test]
    fn test_from_json_unknown_station() {
        let json = r#"{"stations": [{"code": 1, "intensity": 1.0}], "links": [{"from": 1, "to": 2}]}"#;
        let err = RailNetwork::from_reader(json.as_bytes()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DoesNotExist);
    }
}
