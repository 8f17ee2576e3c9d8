use anyhow::Result;
use serde::{de, Deserialize, Deserializer};

use gtfs::{normalize_color, Agency, AgencyID, DirectionID, Route, RouteID, RouteType};

/// The route catalog, grouped by agency, then route group, then direction.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

/// One agency and everything it operates
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub agency_id: AgencyID,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub agency_url: String,
    #[serde(default = "default_timezone")]
    pub agency_timezone: String,
    #[serde(default = "default_lang")]
    pub agency_lang: String,
    pub route_groups: Option<Vec<RouteGroup>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteGroup {
    pub group_id: RouteID,
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// Only "fixed" groups get a schedule
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "loop", default, deserialize_with = "deserialize_yes_no")]
    pub is_loop: bool,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One direction of a route group, backed by one OSM relation
#[derive(Debug, Deserialize)]
pub struct RouteEntry {
    pub name: String,
    #[serde(rename = "directionId")]
    pub direction_id: DirectionID,
    #[serde(rename = "relationId", deserialize_with = "deserialize_string_or_number")]
    pub relation_id: String,
    pub first_departure: Option<String>,
    pub last_departure: Option<String>,
    /// Kept raw. Malformed counts disable the route instead of failing the whole catalog.
    #[serde(default)]
    pub trips: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Bus,
    Angkot,
    Train,
    Tram,
    Ferry,
    #[serde(other)]
    Other,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Bus
    }
}

impl Mode {
    pub fn route_type(self) -> RouteType {
        match self {
            Mode::Train => RouteType::Rail,
            Mode::Tram => RouteType::Tram,
            Mode::Ferry => RouteType::Ferry,
            Mode::Bus | Mode::Angkot | Mode::Other => RouteType::Bus,
        }
    }
}

/// Everything the engine needs to schedule one direction of one route group. Flattened from the
/// catalog so the synthesizer doesn't need to walk the hierarchy.
#[derive(Clone, Debug)]
pub struct RouteDefinition {
    pub agency_id: AgencyID,
    pub group_id: RouteID,
    pub direction_id: DirectionID,
    pub relation_id: String,
    pub name: String,
    pub color: Option<String>,
    pub mode: Mode,
    pub is_loop: bool,
    pub first_departure: Option<String>,
    pub last_departure: Option<String>,
    pub trips: serde_json::Value,
}

impl Catalog {
    pub fn load(path: &str) -> Result<Self> {
        let raw = fs_err::read_to_string(path)?;
        Self::parse(&raw).map_err(|err| anyhow!("Bad catalog {path}: {err}"))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        Ok(catalog)
    }

    /// Categories that have route groups, logging the ones that don't
    fn usable_categories(&self) -> impl Iterator<Item = (&Category, &Vec<RouteGroup>)> {
        self.categories.iter().filter_map(|category| {
            match category.route_groups {
                Some(ref groups) => Some((category, groups)),
                None => {
                    warn!("Skipping category {} without routeGroups", category.name);
                    None
                }
            }
        })
    }

    pub fn agencies(&self) -> Vec<Agency> {
        self.usable_categories()
            .map(|(category, _)| Agency {
                agency_id: category.agency_id.clone(),
                name: category.name.clone(),
                url: category.agency_url.clone(),
                timezone: category.agency_timezone.clone(),
                lang: category.agency_lang.clone(),
            })
            .collect()
    }

    /// One GTFS route per fixed route group
    pub fn routes(&self) -> Vec<Route> {
        let mut routes = Vec::new();
        for (category, groups) in self.usable_categories() {
            for group in groups.iter().filter(|g| g.is_fixed()) {
                routes.push(Route {
                    route_id: group.group_id.clone(),
                    agency_id: category.agency_id.clone(),
                    route_type: category.mode.route_type(),
                    short_name: group.group_id.to_string(),
                    long_name: group.name.clone(),
                    color: normalize_color(&group.color),
                });
            }
        }
        routes
    }

    /// Every direction of every fixed route group, in catalog order
    pub fn route_definitions(&self) -> Vec<RouteDefinition> {
        let mut results = Vec::new();
        for (category, groups) in self.usable_categories() {
            for group in groups {
                if !group.is_fixed() {
                    debug!(
                        "Skipping route group {} of type {:?}",
                        group.group_id, group.kind
                    );
                    continue;
                }
                for route in &group.routes {
                    results.push(RouteDefinition {
                        agency_id: category.agency_id.clone(),
                        group_id: group.group_id.clone(),
                        direction_id: route.direction_id,
                        relation_id: route.relation_id.clone(),
                        name: route.name.clone(),
                        color: normalize_color(&group.color),
                        mode: category.mode,
                        is_loop: group.is_loop,
                        first_departure: route.first_departure.clone(),
                        last_departure: route.last_departure.clone(),
                        trips: route.trips.clone(),
                    });
                }
            }
        }
        results
    }
}

impl RouteGroup {
    pub fn is_fixed(&self) -> bool {
        self.kind.as_deref() == Some("fixed")
    }
}

impl RouteDefinition {
    /// Malformed or missing counts become 0, which disables the route. Negative counts are kept,
    /// so callers can tell them apart in logs.
    pub fn trip_count(&self) -> i64 {
        match self.trips {
            serde_json::Value::Number(ref n) => n.as_i64().unwrap_or(0),
            serde_json::Value::String(ref s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "route {} ({} {} direction {})",
            self.relation_id, self.agency_id, self.group_id, self.direction_id
        )
    }
}

fn default_timezone() -> String {
    "Asia/Jakarta".to_string()
}

fn default_lang() -> String {
    "id".to_string()
}

fn deserialize_yes_no<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Bool(x) => Ok(x),
        serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" | "" => Ok(false),
            _ => Err(de::Error::custom(format!("Unknown loop value {s}"))),
        },
        serde_json::Value::Null => Ok(false),
        x => Err(de::Error::custom(format!("Unknown loop value {x}"))),
    }
}

fn deserialize_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        x => Err(de::Error::custom(format!("Expected a string or number, got {x}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r##"{
      "categories": [
        {
          "name": "Metro Jabar Trans",
          "agencyId": "MJT",
          "mode": "bus",
          "agencyUrl": "https://instagram.com/brt.metrojabartrans",
          "routeGroups": [
            {
              "groupId": "K1",
              "name": "Metro Jabar Trans K1",
              "color": "#1e88e5",
              "type": "fixed",
              "loop": "yes",
              "routes": [
                {"name": "Leuwipanjang - Soreang", "directionId": 0, "relationId": "111",
                 "first_departure": "04:00", "last_departure": "18:00", "trips": "85"},
                {"name": "Soreang - Leuwipanjang", "directionId": 1, "relationId": 112,
                 "first_departure": "04:30", "last_departure": "18:30", "trips": 40}
              ]
            },
            {
              "groupId": "F1",
              "name": "Flex zone",
              "color": "#000000",
              "type": "flex",
              "routes": [{"name": "Anywhere", "directionId": 0, "relationId": "900"}]
            }
          ]
        },
        {
          "name": "KAI Commuter",
          "agencyId": "KCI",
          "mode": "train",
          "routeGroups": [
            {
              "groupId": "B",
              "name": "Commuter Line Bandung Raya",
              "color": "ff0000",
              "type": "fixed",
              "routes": [{"name": "Padalarang - Cicalengka", "directionId": 0, "relationId": "300"}]
            }
          ]
        },
        {"name": "Broken", "agencyId": "BRK"}
      ]
    }"##;

    #[test]
    fn flattens_fixed_groups_in_order() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        let defs = catalog.route_definitions();
        let relations: Vec<&str> = defs.iter().map(|d| d.relation_id.as_str()).collect();
        assert_eq!(relations, vec!["111", "112", "300"]);

        assert_eq!(defs[0].agency_id, AgencyID::new("MJT"));
        assert_eq!(defs[0].group_id, RouteID::new("K1"));
        assert_eq!(defs[1].direction_id, DirectionID(1));
        assert!(defs[0].is_loop);
        assert!(!defs[2].is_loop);
        assert_eq!(defs[2].mode, Mode::Train);
        assert_eq!(defs[0].color.as_deref(), Some("1E88E5"));
    }

    #[test]
    fn trip_counts() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        let defs = catalog.route_definitions();
        assert_eq!(defs[0].trip_count(), 85);
        assert_eq!(defs[1].trip_count(), 40);
        // Missing
        assert_eq!(defs[2].trip_count(), 0);

        let mut def = defs[0].clone();
        def.trips = serde_json::Value::String("eighty".to_string());
        assert_eq!(def.trip_count(), 0);
        def.trips = serde_json::json!(2.5);
        assert_eq!(def.trip_count(), 0);
    }

    #[test]
    fn agencies_and_routes() {
        let catalog = Catalog::parse(CATALOG).unwrap();
        let agencies = catalog.agencies();
        assert_eq!(agencies.len(), 2);
        assert_eq!(agencies[1].timezone, "Asia/Jakarta");
        assert_eq!(agencies[1].lang, "id");

        let routes = catalog.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].route_type, RouteType::Bus);
        assert_eq!(routes[1].route_type, RouteType::Rail);
        assert_eq!(routes[1].long_name, "Commuter Line Bandung Raya");
    }

    #[test]
    fn unknown_modes() {
        let mode: Mode = serde_json::from_str("\"gondola\"").unwrap();
        assert_eq!(mode, Mode::Other);
        assert_eq!(mode.route_type(), RouteType::Bus);
        let mode: Mode = serde_json::from_str("\"angkot\"").unwrap();
        assert_eq!(mode, Mode::Angkot);
    }

    #[test]
    fn structural_errors_are_fatal() {
        assert!(Catalog::parse(r#"{"routes": []}"#).is_err());
        assert!(Catalog::parse(r#"{"categories": [{"name": "No agency"}]}"#).is_err());
        assert!(Catalog::parse("not json").is_err());
    }
}
