use anyhow::Result;
use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::{StopID, Time, TripID};

#[derive(Clone, Debug, PartialEq)]
pub struct StopTime {
    pub stop_id: StopID,
    /// Starts at 1 and is contiguous within a trip
    pub stop_sequence: usize,
    pub arrival_time: Time,
    pub departure_time: Time,
    pub pickup_type: PickupDropOffType,
    pub drop_off_type: PickupDropOffType,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum PickupDropOffType {
    Regular = 0,
    NotAvailable = 1,
    PhoneAgency = 2,
    CoordinateWithDriver = 3,
}

impl StopTime {
    pub fn regular(stop_id: StopID, stop_sequence: usize, arrival: Time, departure: Time) -> Self {
        Self {
            stop_id,
            stop_sequence,
            arrival_time: arrival,
            departure_time: departure,
            pickup_type: PickupDropOffType::Regular,
            drop_off_type: PickupDropOffType::Regular,
        }
    }
}

pub fn write<'a, W: std::io::Write, I: IntoIterator<Item = (&'a TripID, &'a StopTime)>>(
    writer: W,
    stop_times: I,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (trip_id, st) in stop_times {
        writer.serialize(Record {
            trip_id,
            arrival_time: st.arrival_time,
            departure_time: st.departure_time,
            stop_id: &st.stop_id,
            stop_sequence: st.stop_sequence,
            pickup_type: st.pickup_type,
            drop_off_type: st.drop_off_type,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    trip_id: &'a TripID,
    arrival_time: Time,
    departure_time: Time,
    stop_id: &'a StopID,
    stop_sequence: usize,
    pickup_type: PickupDropOffType,
    drop_off_type: PickupDropOffType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_times_are_zero_padded() {
        let trip = TripID::new("trip_1");
        let st = StopTime::regular(
            StopID::new("A"),
            1,
            Time::parse("04:02:23").unwrap(),
            Time::parse("24:02:33").unwrap(),
        );
        let mut out = Vec::new();
        write(&mut out, vec![(&trip, &st)]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence,pickup_type,drop_off_type\n\
             trip_1,04:02:23,24:02:33,A,1,0,0\n"
        );
    }
}
