#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod agency;
mod calendar;
mod ids;
mod routes;
mod shapes;
mod stop_times;
mod stops;
mod time;
mod trips;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use abstutil::prettyprint_usize;
use anyhow::Result;
use geom::GPSBounds;

pub use agency::Agency;
pub use calendar::{DaysOfWeek, Service};
pub use ids::{AgencyID, BlockID, DirectionID, RouteID, ServiceID, ShapeID, StopID, TripID};
pub use routes::{normalize_color, Route, RouteType};
pub use shapes::ShapePoint;
pub use stop_times::{PickupDropOffType, StopTime};
pub use stops::Stop;
pub use time::Time;
pub use trips::Trip;

/// A complete feed, ready to be written as GTFS text tables.
#[derive(Clone)]
pub struct GTFS {
    pub agencies: Vec<Agency>,
    pub routes: Vec<Route>,
    pub stops: BTreeMap<StopID, Stop>,
    // In the order they were generated
    pub trips: Vec<Trip>,
    pub shapes: BTreeMap<ShapeID, Vec<ShapePoint>>,
    pub services: Vec<Service>,
}

impl GTFS {
    pub fn empty() -> Self {
        Self {
            agencies: Vec::new(),
            routes: Vec::new(),
            stops: BTreeMap::new(),
            trips: Vec::new(),
            shapes: BTreeMap::new(),
            services: Vec::new(),
        }
    }

    pub fn num_stop_times(&self) -> usize {
        self.trips.iter().map(|t| t.stop_times.len()).sum()
    }

    /// Checks the invariants every consumer of the feed relies on. Dangling stop references are
    /// only logged.
    pub fn validate(&self) -> Result<()> {
        let route_ids: BTreeSet<&RouteID> = self.routes.iter().map(|r| &r.route_id).collect();
        let service_ids: BTreeSet<&ServiceID> =
            self.services.iter().map(|s| &s.service_id).collect();

        let mut trip_ids = BTreeSet::new();
        let mut unknown_stops = BTreeSet::new();
        for trip in &self.trips {
            if !trip_ids.insert(&trip.trip_id) {
                bail!("Duplicate {:?}", trip.trip_id);
            }
            if !route_ids.contains(&trip.route_id) {
                bail!("{:?} belongs to unknown {:?}", trip.trip_id, trip.route_id);
            }
            if !service_ids.contains(&trip.service_id) {
                bail!("{:?} uses unknown {:?}", trip.trip_id, trip.service_id);
            }
            if let Some(ref shape_id) = trip.shape_id {
                if !self.shapes.contains_key(shape_id) {
                    bail!("{:?} references missing {:?}", trip.trip_id, shape_id);
                }
            }
            if trip.stop_times.is_empty() {
                bail!("{:?} has no stop times", trip.trip_id);
            }

            for (idx, st) in trip.stop_times.iter().enumerate() {
                if st.stop_sequence != idx + 1 {
                    bail!(
                        "{:?} has stop_sequence {} at position {}",
                        trip.trip_id,
                        st.stop_sequence,
                        idx + 1
                    );
                }
                if st.arrival_time > st.departure_time {
                    bail!(
                        "{:?}: arrival time {} is > departure time {}",
                        trip.trip_id,
                        st.arrival_time,
                        st.departure_time
                    );
                }
                if !self.stops.contains_key(&st.stop_id) {
                    unknown_stops.insert(&st.stop_id);
                }
            }
            for pair in trip.stop_times.windows(2) {
                if pair[0].arrival_time > pair[1].arrival_time {
                    bail!(
                        "{:?} goes back in time: {} then {}",
                        trip.trip_id,
                        pair[0].arrival_time,
                        pair[1].arrival_time
                    );
                }
            }
        }
        if !unknown_stops.is_empty() {
            warn!(
                "Stop times reference {} stops not in the stop table: {:?}",
                unknown_stops.len(),
                unknown_stops
            );
        }

        for (shape_id, pts) in &self.shapes {
            for (idx, pt) in pts.iter().enumerate() {
                if pt.sequence != idx + 1 {
                    bail!("{:?} has sequence {} at position {}", shape_id, pt.sequence, idx + 1);
                }
            }
            for pair in pts.windows(2) {
                if let (Some(d1), Some(d2)) = (pair[0].dist_traveled, pair[1].dist_traveled) {
                    if d2 < d1 {
                        bail!("{:?} distance decreases from {d1} to {d2}", shape_id);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn write_to_dir(&self, dir: &str) -> Result<()> {
        fs_err::create_dir_all(dir)?;
        for (name, contents) in self.to_tables()? {
            fs_err::write(format!("{dir}/{name}"), contents)?;
        }
        info!("Wrote GTFS to {dir}");
        Ok(())
    }

    pub fn write_to_zip(&self, path: &str) -> Result<()> {
        let file = fs_err::File::create(path)?;
        let mut archive = zip::ZipWriter::new(file);
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, contents) in self.to_tables()? {
            archive
                .start_file(name, options)
                .map_err(|err| anyhow!("{path}/{name}: {err}"))?;
            archive.write_all(&contents)?;
        }
        archive.finish()?;
        info!("Wrote GTFS archive to {path}");
        Ok(())
    }

    /// Each GTFS table, serialized
    pub fn to_tables(&self) -> Result<Vec<(&'static str, Vec<u8>)>> {
        let mut tables = Vec::new();

        let mut buffer = Vec::new();
        agency::write(&mut buffer, &self.agencies)?;
        tables.push(("agency.txt", buffer));

        let mut buffer = Vec::new();
        routes::write(&mut buffer, &self.routes)?;
        tables.push(("routes.txt", buffer));

        let mut buffer = Vec::new();
        stops::write(&mut buffer, self.stops.values())?;
        tables.push(("stops.txt", buffer));

        let mut buffer = Vec::new();
        trips::write(&mut buffer, &self.trips)?;
        tables.push(("trips.txt", buffer));

        let mut buffer = Vec::new();
        stop_times::write(
            &mut buffer,
            self.trips
                .iter()
                .flat_map(|t| t.stop_times.iter().map(move |st| (&t.trip_id, st))),
        )?;
        tables.push(("stop_times.txt", buffer));

        let mut buffer = Vec::new();
        shapes::write(&mut buffer, &self.shapes)?;
        tables.push(("shapes.txt", buffer));

        let mut buffer = Vec::new();
        calendar::write(&mut buffer, &self.services)?;
        tables.push(("calendar.txt", buffer));

        Ok(tables)
    }

    pub fn summarize(&self) {
        info!(
            "{} agencies, {} routes, {} stops, {} trips, {} stop times, {} shapes",
            prettyprint_usize(self.agencies.len()),
            prettyprint_usize(self.routes.len()),
            prettyprint_usize(self.stops.len()),
            prettyprint_usize(self.trips.len()),
            prettyprint_usize(self.num_stop_times()),
            prettyprint_usize(self.shapes.len()),
        );
        for route in &self.routes {
            let trips: Vec<&Trip> = self
                .trips
                .iter()
                .filter(|t| t.route_id == route.route_id && !t.stop_times.is_empty())
                .collect();
            match (
                trips.iter().map(|t| t.time_range().0).min(),
                trips.iter().map(|t| t.time_range().1).max(),
            ) {
                (Some(start), Some(end)) => info!(
                    "  {}: {} trips from {start} to {end}",
                    route.describe(),
                    prettyprint_usize(trips.len())
                ),
                _ => info!("  {}: no trips", route.describe()),
            }
        }
        for service in &self.services {
            info!(
                "  Service {} runs {} from {} to {}",
                service.service_id,
                service.days_of_week.describe(),
                service.start_date,
                service.end_date
            );
        }
        if !self.stops.is_empty() {
            let mut gps_bounds = GPSBounds::new();
            for stop in self.stops.values() {
                gps_bounds.update(stop.pos);
            }
            dump_bounding_box(&gps_bounds);
        }
    }
}

fn dump_bounding_box(gps_bounds: &GPSBounds) {
    use geojson::{Feature, FeatureCollection, GeoJson};

    let feature = Feature {
        bbox: None,
        geometry: Some(
            gps_bounds
                .to_bounds()
                .get_rectangle()
                .to_geojson(Some(gps_bounds)),
        ),
        id: None,
        properties: None,
        foreign_members: None,
    };
    let gj = GeoJson::FeatureCollection(FeatureCollection {
        features: vec![feature],
        bbox: None,
        foreign_members: None,
    });
    match serde_json::to_string(&gj) {
        Ok(json) => info!("GeoJSON covering the stops: {json}"),
        Err(err) => warn!("Couldn't describe the bounding box: {err}"),
    }
}
