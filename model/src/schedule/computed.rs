use anyhow::Result;
use geom::LonLat;

use super::{RouteContext, ScheduleStrategy};
use crate::config::SpeedModel;
use crate::geodesy::distance_km;
use crate::ids::IdAllocator;
use gtfs::{StopID, StopTime, Time, Trip};

/// For road-based modes without a published timetable. One trip template is derived from the
/// distances between stops, then repeated at a fixed headway between the first and last departure.
pub struct ComputedHeadway<'a> {
    pub speed: &'a SpeedModel,
}

impl<'a> ComputedHeadway<'a> {
    /// Seconds from the origin to each stop, ignoring dwell. The first entry is 0.
    pub fn cumulative_travel_seconds(&self, stops: &[(StopID, LonLat)]) -> Vec<f64> {
        let mut results = Vec::with_capacity(stops.len());
        let mut total = 0.0;
        for (idx, (_, pos)) in stops.iter().enumerate() {
            if idx > 0 {
                total += self.speed.hop_seconds(distance_km(stops[idx - 1].1, *pos));
            }
            results.push(total);
        }
        results
    }
}

impl<'a> ScheduleStrategy for ComputedHeadway<'a> {
    fn name(&self) -> &'static str {
        "computed headway"
    }

    fn schedule(&self, ctx: &RouteContext, ids: &mut IdAllocator) -> Result<Vec<Trip>> {
        let route = ctx.route;
        let stops = match ctx.stops {
            Some(stops) if !stops.is_empty() => stops,
            Some(_) => bail!("stop file has no stops"),
            None => bail!("no stops"),
        };

        let count = route.trip_count();
        if count < 1 {
            warn!(
                "{} has trip count {}, so it gets no trips",
                route.describe(),
                route.trips
            );
            return Ok(Vec::new());
        }

        let first = parse_departure("first_departure", &route.first_departure)?;
        let headway = if count > 1 {
            let last = parse_departure("last_departure", &route.last_departure)?;
            if last < first {
                bail!("last_departure {last} is before first_departure {first}");
            }
            f64::from(last.seconds() - first.seconds()) / (count - 1) as f64
        } else {
            0.0
        };

        let travel = self.cumulative_travel_seconds(stops);
        let dwell = f64::from(self.speed.dwell_seconds);

        let mut trips = Vec::new();
        for idx in 0..count {
            let start = f64::from(first.seconds()) + idx as f64 * headway;
            let trip_number = ids.next_trip_number(&route.group_id, route.direction_id);

            let mut stop_times = Vec::with_capacity(stops.len());
            for (seq, (stop_id, _)) in stops.iter().enumerate() {
                // Dwell accrues for every stop already served
                let arrival = start + travel[seq] + dwell * seq as f64;
                stop_times.push(StopTime::regular(
                    stop_id.clone(),
                    seq + 1,
                    Time::from_seconds_f64(arrival),
                    Time::from_seconds_f64(arrival + dwell),
                ));
            }

            trips.push(ctx.make_trip(
                IdAllocator::computed_trip_id(
                    &route.agency_id,
                    &route.group_id,
                    route.direction_id,
                    trip_number,
                ),
                IdAllocator::block_id(
                    route.is_loop,
                    &route.agency_id,
                    &route.group_id,
                    trip_number,
                ),
                stop_times,
            ));
        }
        Ok(trips)
    }
}

fn parse_departure(field: &str, raw: &Option<String>) -> Result<Time> {
    match raw {
        Some(raw) => Time::parse(raw).map_err(|err| anyhow!("bad {field}: {err}")),
        None => bail!("no {field}"),
    }
}
