use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::catalog::Mode;
use gtfs::AgencyID;

/// Everything the synthesizer needs besides the catalog. Every field has a default, so an empty
/// JSON object is a valid config.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Holds `<relation_id>/stops.geojson` and `<relation_id>/ways.geojson`
    pub route_data_dir: String,
    /// Holds `<agency_id>_<direction_id>.csv`
    pub timetable_dir: String,
    /// Routes with these modes follow a literal timetable instead of a computed headway
    pub timetable_modes: BTreeSet<Mode>,
    /// If set, only these agencies are emitted
    pub agencies: Option<BTreeSet<AgencyID>>,
    pub service_id: String,
    pub calendar_start: NaiveDate,
    pub calendar_end: NaiveDate,
    pub speed: SpeedModel,
    /// When false, shapes are written without shape_dist_traveled
    pub shape_distances: bool,
}

/// How the computed strategy turns distance into time
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpeedModel {
    /// Hops up to this long use `short_hop_kmph`
    pub short_hop_km: f64,
    pub short_hop_kmph: f64,
    pub long_hop_kmph: f64,
    /// Every hop is at least this long, so no two stops share a time
    pub min_hop_km: f64,
    /// Accrues for every stop already served
    pub dwell_seconds: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            route_data_dir: "route-data".to_string(),
            timetable_dir: "timetables".to_string(),
            timetable_modes: vec![Mode::Train].into_iter().collect(),
            agencies: None,
            service_id: "everyday".to_string(),
            calendar_start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            calendar_end: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
            speed: SpeedModel::default(),
            shape_distances: true,
        }
    }
}

impl Default for SpeedModel {
    fn default() -> Self {
        Self {
            short_hop_km: 5.0,
            short_hop_kmph: 30.0,
            long_hop_kmph: 55.0,
            min_hop_km: 0.01,
            dwell_seconds: 10,
        }
    }
}

impl SynthConfig {
    pub fn load(path: &str) -> Result<Self> {
        let raw = fs_err::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|err| anyhow!("Bad config {path}: {err}"))?;
        if config.calendar_start > config.calendar_end {
            bail!(
                "Bad config {path}: calendar_start {} is after calendar_end {}",
                config.calendar_start,
                config.calendar_end
            );
        }
        Ok(config)
    }

    pub fn uses_timetable(&self, mode: Mode) -> bool {
        self.timetable_modes.contains(&mode)
    }

    pub fn includes_agency(&self, agency_id: &AgencyID) -> bool {
        match self.agencies {
            Some(ref allowed) => allowed.contains(agency_id),
            None => true,
        }
    }
}

impl SpeedModel {
    /// Seconds to cover one hop between consecutive stops
    pub fn hop_seconds(&self, km: f64) -> f64 {
        let km = km.max(self.min_hop_km);
        let kmph = if km <= self.short_hop_km {
            self.short_hop_kmph
        } else {
            self.long_hop_kmph
        };
        km / kmph * 3600.0
    }
}
