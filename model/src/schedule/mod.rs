mod computed;
mod explicit;

use anyhow::Result;
use geom::LonLat;

use crate::catalog::{Mode, RouteDefinition};
use crate::config::SynthConfig;
use crate::ids::IdAllocator;
use gtfs::{BlockID, ServiceID, ShapeID, StopID, StopTime, Trip, TripID};

pub use computed::ComputedHeadway;
pub use explicit::ExplicitTimetable;

/// Everything a strategy may use to schedule one route
pub struct RouteContext<'a> {
    pub route: &'a RouteDefinition,
    pub service_id: &'a ServiceID,
    /// None if the route had no geometry
    pub shape_id: Option<ShapeID>,
    /// The route's stops in order, with deduplicated IDs but this route's own positions. None if
    /// the route has no stop file.
    pub stops: Option<&'a [(StopID, LonLat)]>,
}

/// Turns one route into trips. An error means the route can't be scheduled at all; the caller
/// skips it, and nothing partial may have been produced. Strategies must not allocate trip
/// numbers before they know the route is usable.
pub trait ScheduleStrategy {
    fn name(&self) -> &'static str;
    fn schedule(&self, ctx: &RouteContext, ids: &mut IdAllocator) -> Result<Vec<Trip>>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrategyKind {
    ComputedHeadway,
    ExplicitTimetable,
}

impl StrategyKind {
    pub fn for_mode(mode: Mode, config: &SynthConfig) -> Self {
        if config.uses_timetable(mode) {
            StrategyKind::ExplicitTimetable
        } else {
            StrategyKind::ComputedHeadway
        }
    }
}

impl<'a> RouteContext<'a> {
    fn make_trip(
        &self,
        trip_id: TripID,
        block_id: Option<BlockID>,
        stop_times: Vec<StopTime>,
    ) -> Trip {
        Trip {
            trip_id,
            route_id: self.route.group_id.clone(),
            service_id: self.service_id.clone(),
            headsign: self.route.name.clone(),
            direction_id: self.route.direction_id,
            shape_id: self.shape_id.clone(),
            block_id,
            stop_times,
        }
    }
}
