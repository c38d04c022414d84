use serde::Deserialize;

use crate::domain::models::{
    EntrySelection, FieldSet, MapError, MappedReading, SensorPayload, location_tag,
};

pub const RPI_MEASUREMENT: &str = "temp_sensor_data";

/// Message published by the Raspberry Pi sensor nodes on the bus.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpiSensorData {
    #[serde(rename = "sensorLocation")]
    pub sensor_location: String,
    #[serde(rename = "temp_F")]
    pub temp_f: f64,
    #[serde(rename = "temp_C")]
    pub temp_c: f64,
    pub humidity: f64,
}

impl SensorPayload for RpiSensorData {
    const MEASUREMENT: &'static str = RPI_MEASUREMENT;

    fn readings(&self, _selection: EntrySelection) -> Result<Vec<MappedReading>, MapError> {
        let mut fields = FieldSet::new();
        fields.insert_float("temperature_f", self.temp_f)?;
        fields.insert_float("temperature_c", self.temp_c)?;
        fields.insert_float("humidity", self.humidity)?;

        Ok(vec![MappedReading {
            location: location_tag(&self.sensor_location)?,
            fields,
        }])
    }
}
