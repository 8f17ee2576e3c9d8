//! Synthesizes a GTFS feed from a route catalog, per-route stop and way geometry, and published
//! rail timetables.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod catalog;
mod config;
mod geodesy;
mod ids;
mod route_data;
mod schedule;
mod shape;
mod stop_registry;
mod synth;
mod timetable;

pub use self::catalog::{Catalog, Category, Mode, RouteDefinition, RouteEntry, RouteGroup};
pub use self::config::{SpeedModel, SynthConfig};
pub use self::geodesy::{distance_km, seconds_to_time, time_to_seconds};
pub use self::ids::IdAllocator;
pub use self::route_data::{parse_stops, parse_ways, DirInputs, LineGeometry, RouteInputs, StopFeature};
pub use self::schedule::{
    ComputedHeadway, ExplicitTimetable, RouteContext, ScheduleStrategy, StrategyKind,
};
pub use self::shape::{build_shape, flatten, shape_id};
pub use self::stop_registry::StopRegistry;
pub use self::synth::synthesize;
pub use self::timetable::{load as load_timetable, StopCells, Timetable, TimetableRow};
