use std::path::Path;

use anyhow::Result;
use geojson::{Feature, GeoJson, Value};
use geom::LonLat;

use crate::timetable::Timetable;
use gtfs::{AgencyID, DirectionID};

/// A stop as captured along one route, before deduplication
#[derive(Clone, Debug, PartialEq)]
pub struct StopFeature {
    pub id: Option<String>,
    pub name: Option<String>,
    pub pos: LonLat,
    pub wheelchair: bool,
}

/// One feature of a route's way geometry
#[derive(Clone, Debug, PartialEq)]
pub enum LineGeometry {
    Line(Vec<LonLat>),
    MultiLine(Vec<Vec<LonLat>>),
}

/// Where the per-route inputs come from. `Ok(None)` means the input doesn't exist, which only
/// skips that route.
pub trait RouteInputs {
    fn stops(&self, relation_id: &str) -> Result<Option<Vec<StopFeature>>>;
    fn ways(&self, relation_id: &str) -> Result<Option<Vec<LineGeometry>>>;
    fn timetable(&self, agency_id: &AgencyID, direction_id: DirectionID)
        -> Result<Option<Timetable>>;
}

/// Reads `<route_data_dir>/<relation_id>/{stops,ways}.geojson` and
/// `<timetable_dir>/<agency_id>_<direction_id>.csv`
pub struct DirInputs {
    pub route_data_dir: String,
    pub timetable_dir: String,
}

impl RouteInputs for DirInputs {
    fn stops(&self, relation_id: &str) -> Result<Option<Vec<StopFeature>>> {
        let path = format!("{}/{relation_id}/stops.geojson", self.route_data_dir);
        match read_geojson(&path)? {
            Some(gj) => Ok(Some(parse_stops(gj).map_err(|err| anyhow!("{path}: {err}"))?)),
            None => Ok(None),
        }
    }

    fn ways(&self, relation_id: &str) -> Result<Option<Vec<LineGeometry>>> {
        let path = format!("{}/{relation_id}/ways.geojson", self.route_data_dir);
        match read_geojson(&path)? {
            Some(gj) => Ok(Some(parse_ways(gj).map_err(|err| anyhow!("{path}: {err}"))?)),
            None => Ok(None),
        }
    }

    fn timetable(
        &self,
        agency_id: &AgencyID,
        direction_id: DirectionID,
    ) -> Result<Option<Timetable>> {
        let path = format!("{}/{agency_id}_{direction_id}.csv", self.timetable_dir);
        if !Path::new(&path).exists() {
            return Ok(None);
        }
        let file = fs_err::File::open(&path)?;
        let table = crate::timetable::load(file).map_err(|err| anyhow!("{path}: {err}"))?;
        Ok(Some(table))
    }
}

fn read_geojson(path: &str) -> Result<Option<GeoJson>> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let raw = fs_err::read_to_string(path)?;
    let gj = raw
        .parse::<GeoJson>()
        .map_err(|err| anyhow!("{path}: {err}"))?;
    Ok(Some(gj))
}

fn features(gj: GeoJson) -> Result<Vec<Feature>> {
    match gj {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        GeoJson::Feature(f) => Ok(vec![f]),
        GeoJson::Geometry(_) => bail!("Expected features, found a bare geometry"),
    }
}

pub fn parse_stops(gj: GeoJson) -> Result<Vec<StopFeature>> {
    let mut stops = Vec::new();
    for feature in features(gj)? {
        let pos = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(pt)) => to_lon_lat(pt)?,
            x => bail!("Stop isn't a point: {:?}", x),
        };
        let id = feature.property("id").and_then(property_to_string);
        let name = feature.property("name").and_then(property_to_string);
        let wheelchair = feature
            .property("wheelchair")
            .and_then(property_to_string)
            .map(|x| x == "yes")
            .unwrap_or(false);
        stops.push(StopFeature {
            id,
            name,
            pos,
            wheelchair,
        });
    }
    Ok(stops)
}

pub fn parse_ways(gj: GeoJson) -> Result<Vec<LineGeometry>> {
    let mut lines = Vec::new();
    for feature in features(gj)? {
        match feature.geometry.map(|g| g.value) {
            Some(Value::LineString(pts)) => {
                lines.push(LineGeometry::Line(to_lon_lats(&pts)?));
            }
            Some(Value::MultiLineString(parts)) => {
                let mut result = Vec::new();
                for pts in &parts {
                    result.push(to_lon_lats(pts)?);
                }
                lines.push(LineGeometry::MultiLine(result));
            }
            x => {
                debug!("Ignoring way geometry {:?}", x);
            }
        }
    }
    Ok(lines)
}

fn to_lon_lat(pt: &[f64]) -> Result<LonLat> {
    if pt.len() < 2 {
        bail!("Position has {} coordinates", pt.len());
    }
    Ok(LonLat::new(pt[0], pt[1]))
}

fn to_lon_lats(pts: &[Vec<f64>]) -> Result<Vec<LonLat>> {
    pts.iter().map(|pt| to_lon_lat(pt)).collect()
}

// OSM IDs show up as numbers or strings
fn property_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_from_geojson() {
        let gj: GeoJson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [107.6, -6.9]},
             "properties": {"id": "node/1", "name": "Alun-alun", "wheelchair": "yes"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [107.7, -6.8]},
             "properties": {"id": 42}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [107.8, -6.7]},
             "properties": {"name": "Unnamed node", "wheelchair": "no"}}
        ]}"#
        .parse()
        .unwrap();
        let stops = parse_stops(gj).unwrap();
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].id.as_deref(), Some("node/1"));
        assert!(stops[0].wheelchair);
        assert_eq!(stops[1].id.as_deref(), Some("42"));
        assert_eq!(stops[1].name, None);
        assert_eq!(stops[2].id, None);
        assert!(!stops[2].wheelchair);
        assert_eq!(stops[2].pos, LonLat::new(107.8, -6.7));
    }

    #[test]
    fn stops_must_be_points() {
        let gj: GeoJson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
             "properties": {}}
        ]}"#
        .parse()
        .unwrap();
        assert!(parse_stops(gj).is_err());
    }

    #[test]
    fn ways_from_geojson() {
        let gj: GeoJson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [0, 1]]},
             "properties": {}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [5, 5]},
             "properties": {}},
            {"type": "Feature", "geometry": {"type": "MultiLineString",
             "coordinates": [[[0, 1], [0, 2]], [[0, 3], [0, 4]]]}, "properties": {}}
        ]}"#
        .parse()
        .unwrap();
        let ways = parse_ways(gj).unwrap();
        assert_eq!(
            ways,
            vec![
                LineGeometry::Line(vec![LonLat::new(0.0, 0.0), LonLat::new(0.0, 1.0)]),
                LineGeometry::MultiLine(vec![
                    vec![LonLat::new(0.0, 1.0), LonLat::new(0.0, 2.0)],
                    vec![LonLat::new(0.0, 3.0), LonLat::new(0.0, 4.0)]
                ]),
            ]
        );
    }
}
