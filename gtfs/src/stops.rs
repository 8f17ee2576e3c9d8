use anyhow::Result;
use geom::LonLat;
use serde::{Deserialize, Serialize};

use super::StopID;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: StopID,
    pub name: String,
    pub pos: LonLat,
    pub wheelchair_boarding: bool,
}

pub fn write<'a, W: std::io::Write, I: IntoIterator<Item = &'a Stop>>(
    writer: W,
    stops: I,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for stop in stops {
        writer.serialize(Record {
            stop_id: &stop.stop_id,
            stop_name: &stop.name,
            stop_lat: stop.pos.y(),
            stop_lon: stop.pos.x(),
            // Always a plain stop or platform
            location_type: 0,
            wheelchair_boarding: if stop.wheelchair_boarding { 1 } else { 0 },
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    stop_id: &'a StopID,
    stop_name: &'a str,
    stop_lat: f64,
    stop_lon: f64,
    location_type: u8,
    wheelchair_boarding: u8,
}
