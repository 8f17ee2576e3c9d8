use std::collections::{BTreeMap, BTreeSet};

use abstutil::{prettyprint_usize, Timer};
use anyhow::Result;
use geom::LonLat;

use crate::catalog::{Catalog, RouteDefinition};
use crate::config::SynthConfig;
use crate::ids::IdAllocator;
use crate::route_data::RouteInputs;
use crate::schedule::{
    ComputedHeadway, ExplicitTimetable, RouteContext, ScheduleStrategy, StrategyKind,
};
use crate::shape::{build_shape, shape_id};
use crate::stop_registry::StopRegistry;
use crate::timetable::Timetable;
use gtfs::{AgencyID, DirectionID, Service, ServiceID, ShapeID, StopID, Trip, TripID, GTFS};

/// Builds a whole feed from the catalog, one route at a time in catalog order. Routes that can't
/// be scheduled are logged and contribute nothing.
pub fn synthesize(
    catalog: &Catalog,
    config: &SynthConfig,
    inputs: &dyn RouteInputs,
    timer: &mut Timer,
) -> Result<GTFS> {
    let mut synth = Synthesizer::new(config, inputs);

    let mut gtfs = GTFS::empty();
    gtfs.agencies = catalog
        .agencies()
        .into_iter()
        .filter(|a| config.includes_agency(&a.agency_id))
        .collect();
    gtfs.routes = catalog
        .routes()
        .into_iter()
        .filter(|r| config.includes_agency(&r.agency_id))
        .collect();

    let defs: Vec<RouteDefinition> = catalog
        .route_definitions()
        .into_iter()
        .filter(|d| config.includes_agency(&d.agency_id))
        .collect();
    timer.start_iter("synthesize routes", defs.len());
    for def in &defs {
        timer.next();
        synth.add_route(def, &mut gtfs);
    }

    info!(
        "{} of {} routes produced trips, {} were skipped",
        prettyprint_usize(synth.routes_scheduled),
        prettyprint_usize(defs.len()),
        prettyprint_usize(synth.routes_skipped)
    );

    gtfs.stops = synth.registry.into_stops();
    gtfs.services.push(Service::always_on(
        synth.service_id,
        config.calendar_start,
        config.calendar_end,
    ));
    Ok(gtfs)
}

/// The state shared between routes during one run
struct Synthesizer<'a> {
    config: &'a SynthConfig,
    inputs: &'a dyn RouteInputs,
    service_id: ServiceID,
    registry: StopRegistry,
    ids: IdAllocator,
    // None caches a missing or unreadable table, so it's only reported once
    timetables: BTreeMap<(AgencyID, DirectionID), Option<Timetable>>,
    seen_trips: BTreeSet<TripID>,
    routes_scheduled: usize,
    routes_skipped: usize,
}

impl<'a> Synthesizer<'a> {
    fn new(config: &'a SynthConfig, inputs: &'a dyn RouteInputs) -> Self {
        Self {
            config,
            inputs,
            service_id: ServiceID::new(config.service_id.clone()),
            registry: StopRegistry::new(),
            ids: IdAllocator::new(),
            timetables: BTreeMap::new(),
            seen_trips: BTreeSet::new(),
            routes_scheduled: 0,
            routes_skipped: 0,
        }
    }

    fn add_route(&mut self, def: &RouteDefinition, gtfs: &mut GTFS) {
        let shape = self.add_shape(def, gtfs);

        let (stops, unreadable_stops): (Option<Vec<(StopID, LonLat)>>, _) =
            match self.inputs.stops(&def.relation_id) {
                Ok(Some(features)) => (Some(self.registry.register_route(&features)), None),
                Ok(None) => (None, None),
                Err(err) => (None, Some(err)),
            };

        let ctx = RouteContext {
            route: def,
            service_id: &self.service_id,
            shape_id: shape,
            stops: stops.as_deref(),
        };
        let result = match StrategyKind::for_mode(def.mode, self.config) {
            StrategyKind::ComputedHeadway => match unreadable_stops {
                Some(err) => Err(anyhow!("unreadable stops: {err}")),
                None => {
                    let strategy = ComputedHeadway {
                        speed: &self.config.speed,
                    };
                    run(&strategy, &ctx, &mut self.ids)
                }
            },
            StrategyKind::ExplicitTimetable => {
                // The timetable names its own stops
                if let Some(err) = unreadable_stops {
                    warn!("{}: ignoring unreadable stops: {err}", def.describe());
                }
                let key = (def.agency_id.clone(), def.direction_id);
                if !self.timetables.contains_key(&key) {
                    let table = load_timetable(self.inputs, &key.0, key.1);
                    self.timetables.insert(key.clone(), table);
                }
                match self.timetables.get(&key) {
                    Some(Some(table)) => {
                        run(&ExplicitTimetable { table }, &ctx, &mut self.ids)
                    }
                    _ => Err(anyhow!(
                        "no timetable for {} direction {}",
                        def.agency_id,
                        def.direction_id
                    )),
                }
            }
        };

        match result {
            Ok(trips) => {
                if !trips.is_empty() {
                    self.routes_scheduled += 1;
                }
                for trip in trips {
                    self.add_trip(trip, gtfs);
                }
            }
            Err(err) => {
                warn!("Skipping {}: {err}", def.describe());
                self.routes_skipped += 1;
            }
        }
    }

    /// Returns the shape's ID, or None if the route has no usable geometry
    fn add_shape(&self, def: &RouteDefinition, gtfs: &mut GTFS) -> Option<ShapeID> {
        let lines = match self.inputs.ways(&def.relation_id) {
            Ok(Some(lines)) => lines,
            Ok(None) => {
                warn!("{} has no ways, so no shape", def.describe());
                return None;
            }
            Err(err) => {
                warn!("{}: unreadable ways, so no shape: {err}", def.describe());
                return None;
            }
        };
        let points = build_shape(&lines, self.config.shape_distances);
        if points.is_empty() {
            warn!("{} has empty ways, so no shape", def.describe());
            return None;
        }
        let id = shape_id(&def.relation_id);
        gtfs.shapes.insert(id.clone(), points);
        Some(id)
    }

    fn add_trip(&mut self, trip: Trip, gtfs: &mut GTFS) {
        if !self.seen_trips.insert(trip.trip_id.clone()) {
            warn!("Dropping duplicate trip {}", trip.trip_id);
            return;
        }
        gtfs.trips.push(trip);
    }
}

fn run(
    strategy: &dyn ScheduleStrategy,
    ctx: &RouteContext,
    ids: &mut IdAllocator,
) -> Result<Vec<Trip>> {
    let trips = strategy.schedule(ctx, ids)?;
    debug!(
        "{} scheduled {} trips for {}",
        strategy.name(),
        trips.len(),
        ctx.route.describe()
    );
    Ok(trips)
}

fn load_timetable(
    inputs: &dyn RouteInputs,
    agency_id: &AgencyID,
    direction_id: DirectionID,
) -> Option<Timetable> {
    match inputs.timetable(agency_id, direction_id) {
        Ok(Some(table)) => {
            info!(
                "Timetable for {agency_id} direction {direction_id} has {} trips",
                prettyprint_usize(table.num_trips())
            );
            Some(table)
        }
        Ok(None) => None,
        Err(err) => {
            warn!("Ignoring timetable for {agency_id} direction {direction_id}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route_data::{LineGeometry, StopFeature};
    use gtfs::{BlockID, RouteID};

    /// Route inputs held in memory
    #[derive(Default)]
    pub struct MemoryInputs {
        pub stops: BTreeMap<String, Vec<StopFeature>>,
        pub ways: BTreeMap<String, Vec<LineGeometry>>,
        pub timetables: BTreeMap<(AgencyID, DirectionID), String>,
        /// Relations whose stop file exists but can't be parsed
        pub broken_stops: BTreeSet<String>,
    }

    impl RouteInputs for MemoryInputs {
        fn stops(&self, relation_id: &str) -> Result<Option<Vec<StopFeature>>> {
            if self.broken_stops.contains(relation_id) {
                bail!("{relation_id}/stops.geojson: expected features");
            }
            Ok(self.stops.get(relation_id).cloned())
        }

        fn ways(&self, relation_id: &str) -> Result<Option<Vec<LineGeometry>>> {
            Ok(self.ways.get(relation_id).cloned())
        }

        fn timetable(
            &self,
            agency_id: &AgencyID,
            direction_id: DirectionID,
        ) -> Result<Option<Timetable>> {
            match self.timetables.get(&(agency_id.clone(), direction_id)) {
                Some(raw) => Ok(Some(crate::timetable::load(raw.as_bytes())?)),
                None => Ok(None),
            }
        }
    }

    const CATALOG: &str = r#"{
      "categories": [
        {
          "name": "Metro Jabar Trans",
          "agencyId": "MJT",
          "routeGroups": [
            {
              "groupId": "K1", "name": "Leuwipanjang - Soreang", "color": "1e88e5",
              "type": "fixed", "loop": "yes",
              "routes": [
                {"name": "To Soreang", "directionId": 0, "relationId": "111",
                 "first_departure": "04:00", "last_departure": "05:00", "trips": "2"},
                {"name": "To Leuwipanjang", "directionId": 1, "relationId": "112",
                 "first_departure": "04:30", "last_departure": "05:30", "trips": "2"}
              ]
            },
            {
              "groupId": "K2", "name": "Missing data", "type": "fixed",
              "routes": [
                {"name": "Nowhere", "directionId": 0, "relationId": "404",
                 "first_departure": "04:00", "last_departure": "05:00", "trips": "3"},
                {"name": "Not running", "directionId": 1, "relationId": "111",
                 "first_departure": "04:00", "last_departure": "05:00", "trips": "none"}
              ]
            }
          ]
        },
        {
          "name": "KAI Commuter",
          "agencyId": "KCI",
          "mode": "train",
          "routeGroups": [
            {
              "groupId": "B", "name": "Padalarang - Cicalengka", "type": "fixed",
              "routes": [
                {"name": "To Cicalengka", "directionId": 0, "relationId": "300"},
                {"name": "To Padalarang", "directionId": 1, "relationId": "301"}
              ]
            }
          ]
        }
      ]
    }"#;

    fn feature(id: &str, lon: f64, lat: f64) -> StopFeature {
        StopFeature {
            id: Some(id.to_string()),
            name: Some(format!("Halte {id}")),
            pos: LonLat::new(lon, lat),
            wheelchair: false,
        }
    }

    fn inputs() -> MemoryInputs {
        let mut inputs = MemoryInputs::default();
        inputs.stops.insert(
            "111".to_string(),
            vec![feature("A", 0.0, 0.0), feature("B", 0.0, 0.01)],
        );
        inputs.stops.insert(
            "112".to_string(),
            vec![feature("B", 0.0, 0.02), feature("A", 0.0, 0.0)],
        );
        inputs.ways.insert(
            "111".to_string(),
            vec![LineGeometry::Line(vec![
                LonLat::new(0.0, 0.0),
                LonLat::new(0.0, 0.01),
            ])],
        );
        inputs.stops.insert(
            "300".to_string(),
            vec![feature("s1", 0.0, 1.0), feature("s2", 0.0, 1.1)],
        );
        inputs.timetables.insert(
            (AgencyID::new("KCI"), DirectionID(0)),
            "relation,train,s1,s1,s2,s2\n,,arr,dep,arr,dep\n300,KA301,05:00,05:01,05:20,05:21\n300,KA303,06:00,06:01,06:20,06:21\n"
                .to_string(),
        );
        inputs
    }

    fn run_catalog(config: &SynthConfig) -> GTFS {
        let catalog = Catalog::parse(CATALOG).unwrap();
        let inputs = inputs();
        let mut timer = Timer::throwaway();
        synthesize(&catalog, config, &inputs, &mut timer).unwrap()
    }

    #[test]
    fn whole_feed() {
        let gtfs = run_catalog(&SynthConfig::default());
        assert_eq!(gtfs.agencies.len(), 2);
        assert_eq!(gtfs.routes.len(), 3);
        gtfs.validate().unwrap();

        let trip_ids: Vec<&str> = gtfs.trips.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(
            trip_ids,
            vec![
                "trip_MJT_K1_0_1",
                "trip_MJT_K1_0_2",
                "trip_MJT_K1_1_1",
                "trip_MJT_K1_1_2",
                "trip_KCI_B_KA301",
                "trip_KCI_B_KA303",
            ]
        );

        // Loop pairing
        assert_eq!(gtfs.trips[0].block_id, Some(BlockID::new("MJT_K1_1")));
        assert_eq!(gtfs.trips[2].block_id, Some(BlockID::new("MJT_K1_1")));
        assert_eq!(gtfs.trips[4].block_id, None);

        // Only 111 has geometry
        assert_eq!(gtfs.shapes.len(), 1);
        assert_eq!(gtfs.trips[0].shape_id, Some(ShapeID::new("shape_111")));
        assert_eq!(gtfs.trips[2].shape_id, None);

        assert_eq!(gtfs.trips[4].route_id, RouteID::new("B"));
        assert_eq!(gtfs.services.len(), 1);
        assert_eq!(gtfs.services[0].service_id, ServiceID::new("everyday"));
    }

    #[test]
    fn routes_time_hops_from_their_own_stops() {
        let gtfs = run_catalog(&SynthConfig::default());
        assert_eq!(gtfs.stops.len(), 4);
        // Route 112 placed B somewhere else, but route 111 saw it first
        assert_eq!(gtfs.stops[&StopID::new("B")].pos, LonLat::new(0.0, 0.01));
        // Route 112's own hop is 2.22 km, not the 1.11 km the stop table implies
        assert_eq!(gtfs.trips[2].stop_times[1].arrival_time.to_string(), "04:34:37");
        assert_eq!(gtfs.trips[0].stop_times[1].arrival_time.to_string(), "04:02:23");
    }

    #[test]
    fn agency_filter() {
        let mut config = SynthConfig::default();
        config.agencies = Some(vec![AgencyID::new("KCI")].into_iter().collect());
        let gtfs = run_catalog(&config);
        assert_eq!(gtfs.agencies.len(), 1);
        assert_eq!(gtfs.routes.len(), 1);
        assert_eq!(gtfs.trips.len(), 2);
        assert_eq!(gtfs.stops.len(), 2);
        gtfs.validate().unwrap();
    }

    #[test]
    fn duplicate_trips_are_dropped() {
        let catalog = Catalog::parse(
            r#"{"categories": [{"name": "KAI", "agencyId": "KCI", "mode": "train", "routeGroups": [
              {"groupId": "B", "name": "B", "type": "fixed", "routes": [
                {"name": "Main", "directionId": 0, "relationId": "300"},
                {"name": "Again", "directionId": 0, "relationId": "300"}
              ]}
            ]}]}"#,
        )
        .unwrap();
        let inputs = inputs();
        let gtfs = synthesize(
            &catalog,
            &SynthConfig::default(),
            &inputs,
            &mut Timer::throwaway(),
        )
        .unwrap();
        assert_eq!(gtfs.trips.len(), 2);
        gtfs.validate().unwrap();
    }

    #[test]
    fn computed_rail_when_configured() {
        let mut config = SynthConfig::default();
        config.timetable_modes.clear();
        let gtfs = run_catalog(&config);
        // Train routes now need trip counts, which they don't have
        assert!(gtfs
            .trips
            .iter()
            .all(|t| t.route_id != RouteID::new("B")));
    }

    #[test]
    fn unreadable_stops_skip_the_route_once() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        let config = SynthConfig::default();
        let mut inputs = inputs();
        inputs.broken_stops.insert("111".to_string());
        let defs = catalog.route_definitions();

        let mut synth = Synthesizer::new(&config, &inputs);
        let mut gtfs = GTFS::empty();
        synth.add_route(&defs[0], &mut gtfs);
        assert!(gtfs.trips.is_empty());
        assert_eq!(synth.routes_skipped, 1);
        assert_eq!(synth.registry.len(), 0);
        // The skipped route didn't use up any trip numbers
        assert_eq!(
            synth.ids.next_trip_number(&RouteID::new("K1"), DirectionID(0)),
            1
        );

        synth.add_route(&defs[1], &mut gtfs);
        assert_eq!(gtfs.trips[0].trip_id, TripID::new("trip_MJT_K1_1_1"));
        assert_eq!(synth.routes_skipped, 1);
        assert_eq!(synth.routes_scheduled, 1);
    }

    #[test]
    fn unreadable_stops_dont_block_a_timetable() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        let config = SynthConfig::default();
        let mut inputs = inputs();
        inputs.broken_stops.insert("300".to_string());
        let defs = catalog.route_definitions();
        let train = defs.iter().find(|d| d.relation_id == "300").unwrap();

        let mut synth = Synthesizer::new(&config, &inputs);
        let mut gtfs = GTFS::empty();
        synth.add_route(train, &mut gtfs);
        assert_eq!(gtfs.trips.len(), 2);
        assert_eq!(synth.routes_skipped, 0);
    }
}
