use anyhow::Result;

use super::{RouteContext, ScheduleStrategy};
use crate::ids::IdAllocator;
use crate::timetable::{StopCells, Timetable, TimetableRow};
use gtfs::{StopTime, Time, Trip};

// A drop bigger than this between consecutive cells means the trip ran past midnight
const ROLLOVER_THRESHOLD: u32 = 12 * 3600;
const DAY: u32 = 24 * 3600;

/// For rail, which publishes a literal timetable. Every row of the table matching the route
/// becomes one trip, keyed by the row's own trip number.
pub struct ExplicitTimetable<'a> {
    pub table: &'a Timetable,
}

impl<'a> ScheduleStrategy for ExplicitTimetable<'a> {
    fn name(&self) -> &'static str {
        "explicit timetable"
    }

    fn schedule(&self, ctx: &RouteContext, _: &mut IdAllocator) -> Result<Vec<Trip>> {
        let route = ctx.route;
        let mut trips = Vec::new();
        for row in self.table.rows_for(&route.relation_id) {
            let token = row.token.trim();
            if token.is_empty() {
                warn!("{}: skipping a timetable row with no trip number", route.describe());
                continue;
            }
            let stop_times = match self.row_to_stop_times(&row) {
                Ok(stop_times) => stop_times,
                Err(err) => {
                    warn!("{}: skipping train {token}: {err}", route.describe());
                    continue;
                }
            };
            trips.push(ctx.make_trip(
                IdAllocator::timetable_trip_id(&route.agency_id, &route.group_id, token),
                IdAllocator::block_id(route.is_loop, &route.agency_id, &route.group_id, token),
                stop_times,
            ));
        }
        if trips.is_empty() {
            bail!(
                "timetable has no usable trips for relation {}",
                route.relation_id
            );
        }
        Ok(trips)
    }
}

impl<'a> ExplicitTimetable<'a> {
    fn row_to_stop_times(&self, row: &TimetableRow) -> Result<Vec<StopTime>> {
        let mut stop_times = Vec::new();
        let mut clock = ServiceClock::new();
        for cells in self.table.stop_cells(row) {
            let StopCells {
                stop_id,
                arrival,
                departure,
            } = cells;
            let (arrival, departure) = match (arrival, departure) {
                (Some(a), Some(d)) => (a, d),
                (Some(x), None) | (None, Some(x)) => (x, x),
                // stop_cells already drops these
                (None, None) => continue,
            };
            let arrival = clock.advance(Time::parse(arrival)?)?;
            let departure = clock.advance(Time::parse(departure)?)?;
            stop_times.push(StopTime::regular(
                stop_id,
                stop_times.len() + 1,
                arrival,
                departure,
            ));
        }
        if stop_times.is_empty() {
            bail!("no stop has a time");
        }
        Ok(stop_times)
    }
}

/// Keeps a trip's times non-decreasing as it crosses midnight, since the table only has
/// wall-clock times.
struct ServiceClock {
    last: Option<Time>,
    day_offset: u32,
}

impl ServiceClock {
    fn new() -> Self {
        Self {
            last: None,
            day_offset: 0,
        }
    }

    fn advance(&mut self, wall_clock: Time) -> Result<Time> {
        let mut time = wall_clock.offset(self.day_offset)?;
        if let Some(last) = self.last {
            if time < last {
                if last.seconds() - time.seconds() <= ROLLOVER_THRESHOLD {
                    bail!("{wall_clock} comes after {last}");
                }
                time = time.offset(DAY)?;
                self.day_offset += DAY;
                if time < last {
                    bail!("{wall_clock} comes after {last}, even on the next day");
                }
            }
        }
        self.last = Some(time);
        Ok(time)
    }
}
