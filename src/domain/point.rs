use chrono::{DateTime, Utc};

use crate::domain::models::FieldSet;

pub const SENSOR_LOCATION_TAG: &str = "sensor_location";

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// One record written to the time-series store. Carries exactly one tag,
/// `sensor_location`, and is stamped when it is written, not when measured.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub measurement: String,
    pub sensor_location: String,
    pub fields: FieldSet,
    pub timestamp: DateTime<Utc>,
}

impl TimeSeriesPoint {
    pub fn tags(&self) -> [(&'static str, &str); 1] {
        [(SENSOR_LOCATION_TAG, self.sensor_location.as_str())]
    }
}
