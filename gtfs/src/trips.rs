use anyhow::Result;
use serde::Serialize;

use super::{BlockID, DirectionID, RouteID, ServiceID, ShapeID, StopTime, Time, TripID};

#[derive(Clone, Debug)]
pub struct Trip {
    pub trip_id: TripID,
    pub route_id: RouteID,
    pub service_id: ServiceID,
    pub headsign: String,
    pub direction_id: DirectionID,
    /// None when the route had no geometry
    pub shape_id: Option<ShapeID>,
    /// Only set for loop route groups. Trips sharing this are operated by one vehicle.
    pub block_id: Option<BlockID>,

    pub stop_times: Vec<StopTime>,
}

impl Trip {
    /// Panics if the trip has no stop times.
    pub fn time_range(&self) -> (Time, Time) {
        (
            self.stop_times[0].arrival_time,
            self.stop_times.last().unwrap().departure_time,
        )
    }
}

pub fn write<'a, W: std::io::Write, I: IntoIterator<Item = &'a Trip>>(
    writer: W,
    trips: I,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for trip in trips {
        writer.serialize(Record {
            route_id: &trip.route_id,
            service_id: &trip.service_id,
            trip_id: &trip.trip_id,
            trip_headsign: &trip.headsign,
            direction_id: trip.direction_id,
            shape_id: trip.shape_id.as_ref(),
            block_id: trip.block_id.as_ref(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    route_id: &'a RouteID,
    service_id: &'a ServiceID,
    trip_id: &'a TripID,
    trip_headsign: &'a str,
    direction_id: DirectionID,
    shape_id: Option<&'a ShapeID>,
    block_id: Option<&'a BlockID>,
}
