use anyhow::Result;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::ServiceID;

#[derive(Clone, Debug)]
pub struct Service {
    pub service_id: ServiceID,
    pub days_of_week: DaysOfWeek,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DaysOfWeek {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl Service {
    /// Active every day between the two dates. No exceptions are ever generated.
    pub fn always_on(service_id: ServiceID, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            service_id,
            days_of_week: DaysOfWeek::all(),
            start_date,
            end_date,
        }
    }
}

impl DaysOfWeek {
    pub fn all() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
        }
    }

    pub fn describe(&self) -> String {
        let weekdays = [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
        ]
        .into_iter()
        .filter(|x| *x)
        .count();
        let weekends = [self.saturday, self.sunday]
            .into_iter()
            .filter(|x| *x)
            .count();
        if weekdays + weekends == 7 {
            return "every day".to_string();
        }
        if weekdays == 5 && weekends == 0 {
            return "weekdays".to_string();
        }
        if weekdays == 0 && weekends == 2 {
            return "weekends".to_string();
        }
        if weekdays == 0 && weekends == 0 {
            return "never".to_string();
        }
        let mut result = String::new();
        for (day, operates) in [
            ("M", self.monday),
            ("T", self.tuesday),
            ("W", self.wednesday),
            ("Th", self.thursday),
            ("F", self.friday),
            ("Sat", self.saturday),
            ("Sun", self.sunday),
        ] {
            if operates {
                result.push_str(day);
            }
        }
        result
    }
}

pub fn write<W: std::io::Write>(writer: W, services: &[Service]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for service in services {
        let days = &service.days_of_week;
        writer.serialize(Record {
            service_id: &service.service_id,
            monday: days.monday,
            tuesday: days.tuesday,
            wednesday: days.wednesday,
            thursday: days.thursday,
            friday: days.friday,
            saturday: days.saturday,
            sunday: days.sunday,
            start_date: service.start_date,
            end_date: service.end_date,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Record<'a> {
    service_id: &'a ServiceID,
    #[serde(serialize_with = "serialize_bool")]
    monday: bool,
    #[serde(serialize_with = "serialize_bool")]
    tuesday: bool,
    #[serde(serialize_with = "serialize_bool")]
    wednesday: bool,
    #[serde(serialize_with = "serialize_bool")]
    thursday: bool,
    #[serde(serialize_with = "serialize_bool")]
    friday: bool,
    #[serde(serialize_with = "serialize_bool")]
    saturday: bool,
    #[serde(serialize_with = "serialize_bool")]
    sunday: bool,
    #[serde(serialize_with = "serialize_date")]
    start_date: NaiveDate,
    #[serde(serialize_with = "serialize_date")]
    end_date: NaiveDate,
}

fn serialize_bool<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*value))
}

fn serialize_date<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&date.format("%Y%m%d").to_string())
}
