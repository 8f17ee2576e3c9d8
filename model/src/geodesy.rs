use anyhow::Result;
use geom::LonLat;

use gtfs::Time;

// geom measures in meters on a slightly different radius, but shape_dist_traveled and the speed
// tiers are in km on this sphere
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance using the haversine formula. NaN coordinates produce NaN.
pub fn distance_km(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// "HH:MM" (or "HH:MM:SS") to seconds since midnight
pub fn time_to_seconds(raw: &str) -> Result<u32> {
    Ok(Time::parse(raw)?.seconds())
}

/// Rounds to the nearest second and formats as zero-padded "HH:MM:SS", hours unbounded
pub fn seconds_to_time(seconds: f64) -> String {
    Time::from_seconds_f64(seconds).to_string()
}
