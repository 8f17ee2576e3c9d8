use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::{AgencyID, RouteID};

/// One published line. Both directions of a catalog route group share this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Route {
    pub route_id: RouteID,
    pub agency_id: AgencyID,
    pub route_type: RouteType,
    pub short_name: String,
    pub long_name: String,
    /// RRGGBB, without a leading '#'
    pub color: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum RouteType {
    Tram = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
}

impl Route {
    pub fn describe(&self) -> String {
        format!("{} {} ({:?})", self.short_name, self.long_name, self.route_type)
    }
}

/// Normalizes "#ff00aa" into "FF00AA". Anything that isn't 6 hex digits is dropped.
pub fn normalize_color(raw: &str) -> Option<String> {
    let color = raw.trim().trim_start_matches('#');
    if color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(color.to_ascii_uppercase())
    } else {
        None
    }
}

pub fn write<W: std::io::Write>(writer: W, routes: &[Route]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for route in routes {
        writer.serialize(Record {
            route_id: &route.route_id,
            agency_id: &route.agency_id,
            route_short_name: &route.short_name,
            route_long_name: &route.long_name,
            route_type: route.route_type,
            route_color: route.color.as_deref(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    route_id: &'a RouteID,
    agency_id: &'a AgencyID,
    route_short_name: &'a str,
    route_long_name: &'a str,
    route_type: RouteType,
    route_color: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors() {
        assert_eq!(normalize_color("#ff00aa"), Some("FF00AA".to_string()));
        assert_eq!(normalize_color("1E88E5"), Some("1E88E5".to_string()));
        assert_eq!(normalize_color("red"), None);
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn route_type_is_written_as_number() {
        let route = Route {
            route_id: RouteID::new("K1"),
            agency_id: AgencyID::new("MJT"),
            route_type: RouteType::Rail,
            short_name: "K1".to_string(),
            long_name: "Metro Jabar Trans K1".to_string(),
            color: None,
        };
        let mut out = Vec::new();
        write(&mut out, &[route]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "route_id,agency_id,route_short_name,route_long_name,route_type,route_color\n\
             K1,MJT,K1,Metro Jabar Trans K1,2,\n"
        );
    }
}
