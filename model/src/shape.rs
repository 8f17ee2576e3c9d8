use geom::LonLat;

use crate::geodesy::distance_km;
use crate::route_data::LineGeometry;
use gtfs::{ShapeID, ShapePoint};

pub fn shape_id(relation_id: &str) -> ShapeID {
    ShapeID::new(format!("shape_{relation_id}"))
}

/// Concatenates every line in the given order into one shape. Nothing is reordered, deduplicated,
/// or simplified, so gaps between ways stay as straight jumps.
pub fn flatten(lines: &[LineGeometry]) -> Vec<LonLat> {
    let mut pts = Vec::new();
    for line in lines {
        match line {
            LineGeometry::Line(line) => pts.extend(line.iter().cloned()),
            LineGeometry::MultiLine(parts) => {
                for part in parts {
                    pts.extend(part.iter().cloned());
                }
            }
        }
    }
    pts
}

/// One point per input coordinate, with cumulative distance in km if `with_distance`. Returns
/// nothing if there are no coordinates.
pub fn build_shape(lines: &[LineGeometry], with_distance: bool) -> Vec<ShapePoint> {
    let pts = flatten(lines);
    let mut results = Vec::with_capacity(pts.len());
    let mut dist_so_far = 0.0;
    for (idx, pos) in pts.iter().enumerate() {
        if idx > 0 {
            dist_so_far += distance_km(pts[idx - 1], *pos);
        }
        results.push(ShapePoint {
            pos: *pos,
            sequence: idx + 1,
            dist_traveled: if with_distance {
                Some(dist_so_far)
            } else {
                None
            },
        });
    }
    results
}
