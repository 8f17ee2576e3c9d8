use std::fmt;

use anyhow::Result;
use serde::{Serialize, Serializer};

/// Seconds since midnight of the service day. GTFS allows times past 24:00 for service running
/// after midnight, so the hour is never wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u32);

impl Time {
    pub const START_OF_DAY: Time = Time(0);

    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Rounds to the nearest whole second. Negative input clamps to midnight.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        Self(seconds.round().max(0.0) as u32)
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    /// Parses "HH:MM" or "HH:MM:SS". The hour may exceed 23.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            bail!("'{raw}' isn't HH:MM or HH:MM:SS");
        }
        let mut fields = Vec::new();
        for part in &parts {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                bail!("'{raw}' isn't HH:MM or HH:MM:SS");
            }
            fields.push(part.parse::<u32>()?);
        }
        let (hours, minutes) = (fields[0], fields[1]);
        let seconds = fields.get(2).cloned().unwrap_or(0);
        if minutes > 59 || seconds > 59 {
            bail!("'{raw}' has out-of-range minutes or seconds");
        }
        hours
            .checked_mul(3600)
            .and_then(|x| x.checked_add(minutes * 60 + seconds))
            .map(Self)
            .ok_or_else(|| anyhow!("'{raw}' is too far past midnight"))
    }

    /// Fails rather than wrapping around
    pub fn offset(self, seconds: u32) -> Result<Self> {
        match self.0.checked_add(seconds) {
            Some(x) => Ok(Self(x)),
            None => bail!("{self} plus {seconds}s is too far past midnight"),
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            self.0 % 3600 / 60,
            self.0 % 60
        )
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
