use anyhow::Result;
use geom::LonLat;
use serde::Serialize;

use super::ShapeID;

#[derive(Clone, Debug, PartialEq)]
pub struct ShapePoint {
    pub pos: LonLat,
    /// Starts at 1 and is contiguous within a shape
    pub sequence: usize,
    /// Kilometers from the first point. None when no distance model was applied.
    pub dist_traveled: Option<f64>,
}

pub fn write<'a, W: std::io::Write, I: IntoIterator<Item = (&'a ShapeID, &'a Vec<ShapePoint>)>>(
    writer: W,
    shapes: I,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (shape_id, pts) in shapes {
        for pt in pts {
            writer.serialize(Record {
                shape_id,
                shape_pt_lat: pt.pos.y(),
                shape_pt_lon: pt.pos.x(),
                shape_pt_sequence: pt.sequence,
                shape_dist_traveled: pt.dist_traveled,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    shape_id: &'a ShapeID,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: usize,
    shape_dist_traveled: Option<f64>,
}
