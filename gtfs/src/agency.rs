use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AgencyID;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agency {
    pub agency_id: AgencyID,
    pub name: String,
    pub url: String,
    pub timezone: String,
    pub lang: String,
}

pub fn write<W: std::io::Write>(writer: W, agencies: &[Agency]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for agency in agencies {
        writer.serialize(Record {
            agency_id: &agency.agency_id,
            agency_name: &agency.name,
            agency_url: &agency.url,
            agency_timezone: &agency.timezone,
            agency_lang: &agency.lang,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    agency_id: &'a AgencyID,
    agency_name: &'a str,
    agency_url: &'a str,
    agency_timezone: &'a str,
    agency_lang: &'a str,
}
