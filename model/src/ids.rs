use std::collections::BTreeMap;
use std::fmt::Display;

use gtfs::{AgencyID, BlockID, DirectionID, RouteID, TripID};

/// Builds trip and block IDs. These are the feed's external keys, so they only depend on the
/// catalog and the order routes are processed in.
///
/// Block IDs leave out the direction. For loop groups, trip N in one direction shares a block with
/// trip N in the other direction, which pairs them onto one vehicle only if both directions run the
/// same number of trips.
pub struct IdAllocator {
    // Per (group, direction), the last trip number handed out
    trip_numbers: BTreeMap<(RouteID, DirectionID), usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            trip_numbers: BTreeMap::new(),
        }
    }

    /// Numbers continue across every route sharing the group and direction, starting from 1.
    pub fn next_trip_number(&mut self, group_id: &RouteID, direction_id: DirectionID) -> usize {
        let counter = self
            .trip_numbers
            .entry((group_id.clone(), direction_id))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn computed_trip_id(
        agency_id: &AgencyID,
        group_id: &RouteID,
        direction_id: DirectionID,
        trip_number: usize,
    ) -> TripID {
        TripID::new(format!(
            "trip_{agency_id}_{group_id}_{direction_id}_{trip_number}"
        ))
    }

    /// Timetable trips are keyed by the table's own trip number token
    pub fn timetable_trip_id(agency_id: &AgencyID, group_id: &RouteID, token: &str) -> TripID {
        TripID::new(format!("trip_{agency_id}_{group_id}_{token}"))
    }

    /// None unless the group is a loop
    pub fn block_id<N: Display>(
        is_loop: bool,
        agency_id: &AgencyID,
        group_id: &RouteID,
        trip_number: N,
    ) -> Option<BlockID> {
        if is_loop {
            Some(BlockID::new(format!("{agency_id}_{group_id}_{trip_number}")))
        } else {
            None
        }
    }
}
