use std::collections::BTreeMap;

use geom::LonLat;

use crate::route_data::StopFeature;
use gtfs::{Stop, StopID};

/// Deduplicates stops across every route by ID. The first feature seen for an ID wins; later
/// ones with different names or positions are ignored, not merged.
pub struct StopRegistry {
    stops: BTreeMap<StopID, Stop>,
    // Stops without an ID get stop_1, stop_2, ...
    synthetic_counter: usize,
}

impl StopRegistry {
    pub fn new() -> Self {
        Self {
            stops: BTreeMap::new(),
            synthetic_counter: 0,
        }
    }

    /// Returns the ID the stop is known by, and the position this route gave it. The stop table
    /// keeps the first position seen, but each route times its hops from its own coordinates.
    pub fn register(&mut self, feature: &StopFeature) -> (StopID, LonLat) {
        let stop_id = match feature.id {
            Some(ref id) => StopID::new(id.clone()),
            None => self.synthetic_id(),
        };
        self.stops.entry(stop_id.clone()).or_insert_with(|| Stop {
            stop_id: stop_id.clone(),
            name: feature
                .name
                .clone()
                .unwrap_or_else(|| format!("Stop {stop_id}")),
            pos: feature.pos,
            wheelchair_boarding: feature.wheelchair,
        });
        (stop_id, feature.pos)
    }

    /// Registers every stop along one route, returning the route's stop sequence.
    pub fn register_route(&mut self, features: &[StopFeature]) -> Vec<(StopID, LonLat)> {
        features.iter().map(|f| self.register(f)).collect()
    }

    fn synthetic_id(&mut self) -> StopID {
        loop {
            self.synthetic_counter += 1;
            let id = StopID::new(format!("stop_{}", self.synthetic_counter));
            // An external ID could happen to look synthetic
            if !self.stops.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn into_stops(self) -> BTreeMap<StopID, Stop> {
        self.stops
    }
}
