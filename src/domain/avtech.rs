use serde::Deserialize;

use crate::domain::models::{
    EntrySelection, FieldSet, MapError, MappedReading, SensorPayload, location_tag,
    select_entries,
};

pub const AVTECH_MEASUREMENT: &str = "temp_sensor_data";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AvtechResponse {
    pub sensor: Vec<AvtechSensor>,
}

/// One probe of an Avtech room monitor. The device reports every value as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AvtechSensor {
    pub label: String,
    #[serde(rename = "tempf")]
    pub temp_f: String,
    #[serde(rename = "tempc")]
    pub temp_c: String,
    #[serde(rename = "highf", default)]
    pub high_f: String,
    #[serde(rename = "highc", default)]
    pub high_c: String,
    #[serde(rename = "lowf", default)]
    pub low_f: String,
    #[serde(rename = "lowc", default)]
    pub low_c: String,
}

impl AvtechSensor {
    fn fields(&self) -> Result<FieldSet, MapError> {
        let mut fields = FieldSet::new();
        fields.insert_float("temperature_f", parse_reading("temperature_f", &self.temp_f)?)?;
        fields.insert_float("temperature_c", parse_reading("temperature_c", &self.temp_c)?)?;
        Ok(fields)
    }
}

impl SensorPayload for AvtechResponse {
    const MEASUREMENT: &'static str = AVTECH_MEASUREMENT;

    fn readings(&self, selection: EntrySelection) -> Result<Vec<MappedReading>, MapError> {
        select_entries(&self.sensor, selection, AVTECH_MEASUREMENT)?
            .iter()
            .map(|sensor| {
                let location = match selection {
                    EntrySelection::First => None,
                    EntrySelection::All => location_tag(&sensor.label)?,
                };
                Ok(MappedReading {
                    location,
                    fields: sensor.fields()?,
                })
            })
            .collect()
    }
}

fn parse_reading(field: &'static str, raw: &str) -> Result<f64, MapError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| MapError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
