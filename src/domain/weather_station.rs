use serde::Deserialize;

use crate::domain::models::{
    EntrySelection, FieldSet, FieldValue, MapError, MappedReading, SensorPayload,
    location_tag, select_entries,
};

pub const WEATHER_STATION_MEASUREMENT: &str = "weather_station_data";

/// Keys written for every station reading.
pub const WEATHER_STATION_FIELDS: [&str; 20] = [
    "temperature_inside_f",
    "humidity_inside",
    "temperature_outside_f",
    "humidity_outside",
    "barometric_relative_in",
    "barometric_absolute_in",
    "wind_direction",
    "wind_speed_mph",
    "wind_gust_mph",
    "max_daily_gust_mph",
    "rain_hourly_in",
    "rain_event_in",
    "rain_daily_in",
    "rain_weekly_in",
    "rain_monthly_in",
    "rain_total_in",
    "solar_radiation",
    "uv_index",
    "battery_outside",
    "battery_co2",
];

/// The device list returned by the Ambient Weather REST API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct WeatherStationResponse(pub Vec<WeatherStationSnapshot>);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherStationSnapshot {
    pub mac_address: String,
    pub last_data: LastData,
    #[serde(default)]
    pub info: StationInfo,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StationInfo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LastData {
    #[serde(rename = "dateutc", default)]
    pub date_utc: i64,
    #[serde(rename = "tempinf")]
    pub inside_temp_f: f64,
    #[serde(rename = "humidityin")]
    pub inside_humidity: i64,
    #[serde(rename = "baromrelin")]
    pub barometric_rel_in: f64,
    #[serde(rename = "baromabsin")]
    pub barometric_abs_in: f64,
    #[serde(rename = "tempf")]
    pub outside_temp_f: f64,
    #[serde(rename = "battout")]
    pub outside_battery: i64,
    #[serde(rename = "humidity")]
    pub outside_humidity: i64,
    #[serde(rename = "winddir")]
    pub wind_direction: i64,
    #[serde(rename = "windspeedmph")]
    pub wind_speed_mph: f64,
    #[serde(rename = "windgustmph")]
    pub wind_gust_mph: f64,
    #[serde(rename = "maxdailygust")]
    pub max_daily_gust: f64,
    #[serde(rename = "hourlyrainin")]
    pub hourly_rain_in: f64,
    #[serde(rename = "eventrainin")]
    pub event_rain_in: f64,
    #[serde(rename = "dailyrainin")]
    pub daily_rain_in: f64,
    #[serde(rename = "weeklyrainin")]
    pub weekly_rain_in: f64,
    #[serde(rename = "monthlyrainin")]
    pub monthly_rain_in: f64,
    #[serde(rename = "totalrainin")]
    pub total_rain_in: f64,
    #[serde(rename = "solarradiation")]
    pub solar_radiation: f64,
    #[serde(rename = "uv")]
    pub uv_index: f64,
    // Stations without a CO2 sensor omit the key.
    #[serde(rename = "batt_co2", default)]
    pub co2_battery: i64,
    #[serde(rename = "feelsLike", default)]
    pub feels_like_outside: Option<f64>,
    #[serde(rename = "dewPoint", default)]
    pub dew_point_outside: Option<f64>,
    #[serde(rename = "feelsLikein", default)]
    pub feels_like_inside: Option<f64>,
    #[serde(rename = "dewPointin", default)]
    pub dew_point_inside: Option<f64>,
    #[serde(rename = "lastRain", default)]
    pub last_rain: Option<String>,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl WeatherStationSnapshot {
    fn fields(&self) -> Result<FieldSet, MapError> {
        let data = &self.last_data;
        let mut fields = FieldSet::new();

        let floats = [
            ("temperature_inside_f", data.inside_temp_f),
            ("temperature_outside_f", data.outside_temp_f),
            ("barometric_relative_in", data.barometric_rel_in),
            ("barometric_absolute_in", data.barometric_abs_in),
            ("wind_speed_mph", data.wind_speed_mph),
            ("wind_gust_mph", data.wind_gust_mph),
            ("max_daily_gust_mph", data.max_daily_gust),
            ("rain_hourly_in", data.hourly_rain_in),
            ("rain_event_in", data.event_rain_in),
            ("rain_daily_in", data.daily_rain_in),
            ("rain_weekly_in", data.weekly_rain_in),
            ("rain_monthly_in", data.monthly_rain_in),
            ("rain_total_in", data.total_rain_in),
            ("solar_radiation", data.solar_radiation),
            ("uv_index", data.uv_index),
        ];
        for (key, value) in floats {
            fields.insert_float(key, value)?;
        }

        // Counters and flags are stored as floats so every field of the
        // measurement has one type.
        let counters = [
            ("humidity_inside", data.inside_humidity),
            ("humidity_outside", data.outside_humidity),
            ("wind_direction", data.wind_direction),
            ("battery_outside", data.outside_battery),
            ("battery_co2", data.co2_battery),
        ];
        for (key, value) in counters {
            fields.insert(key, FieldValue::Float(value as f64));
        }

        Ok(fields)
    }

    fn identity(&self) -> Result<Option<String>, MapError> {
        match location_tag(&self.info.name)? {
            Some(name) => Ok(Some(name)),
            None => location_tag(&self.mac_address),
        }
    }
}

impl SensorPayload for WeatherStationResponse {
    const MEASUREMENT: &'static str = WEATHER_STATION_MEASUREMENT;

    fn readings(&self, selection: EntrySelection) -> Result<Vec<MappedReading>, MapError> {
        select_entries(&self.0, selection, WEATHER_STATION_MEASUREMENT)?
            .iter()
            .map(|station| {
                let location = match selection {
                    EntrySelection::First => None,
                    EntrySelection::All => station.identity()?,
                };
                Ok(MappedReading {
                    location,
                    fields: station.fields()?,
                })
            })
            .collect()
    }
}
