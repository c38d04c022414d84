use std::time::Duration;

use crate::adapters::influx::InfluxSettings;
use crate::adapters::mqtt::MqttSettings;
use crate::app::AppError;
use crate::app::policy::WriteFailurePolicy;
use crate::domain::models::EntrySelection;

const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub url: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub influx: InfluxSettings,
    pub avtech: Option<SourceConfig>,
    pub weather_station: Option<SourceConfig>,
    pub mqtt: Option<MqttSettings>,
    pub poll_interval: Duration,
    pub http_timeout: Option<Duration>,
    pub entry_selection: EntrySelection,
    pub write_failure_policy: WriteFailurePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_timeout = match parse_or_default(&lookup, "HTTP_TIMEOUT_SECS", 30_u64)? {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        };

        let influx = InfluxSettings {
            url: required(&lookup, "INFLUXDB_URL")?,
            token: required(&lookup, "INFLUXDB_API_TOKEN")?,
            org: required(&lookup, "INFLUXDB_ORG")?,
            bucket: required(&lookup, "INFLUXDB_BUCKET")?,
            insecure_skip_verify: parse_bool_or_default(
                &lookup,
                "INFLUXDB_INSECURE_SKIP_VERIFY",
                false,
            )?,
            timeout: http_timeout,
        };

        let avtech = optional(&lookup, "AVTECH_URL").map(|url| SourceConfig {
            url,
            location: optional(&lookup, "AVTECH_SENSOR_LOCATION")
                .unwrap_or_else(|| "basement_rack".to_string()),
        });

        let weather_station = optional(&lookup, "AMBIENT_FULL_URL").map(|url| SourceConfig {
            url,
            location: optional(&lookup, "WEATHER_STATION_LOCATION")
                .unwrap_or_else(|| "weather_station".to_string()),
        });

        let mqtt = match optional(&lookup, "MQTT_BROKER_IP") {
            Some(host) => Some(MqttSettings {
                host,
                port: parse_or_default(&lookup, "MQTT_BROKER_PORT", 1883_u16)?,
                client_id: optional(&lookup, "MQTT_CLIENT_ID")
                    .unwrap_or_else(|| "goSensorDataCollector".to_string()),
                topic: optional(&lookup, "MQTT_SUB_TOPIC").ok_or_else(|| {
                    AppError::config("MQTT_SUB_TOPIC is required when MQTT_BROKER_IP is set")
                })?,
                keep_alive: MQTT_KEEP_ALIVE,
                publish_test_message: parse_bool_or_default(
                    &lookup,
                    "MQTT_PUBLISH_TEST_MESSAGE",
                    false,
                )?,
            }),
            None => None,
        };

        if avtech.is_none() && weather_station.is_none() && mqtt.is_none() {
            return Err(AppError::config(
                "at least one of AVTECH_URL, AMBIENT_FULL_URL or MQTT_BROKER_IP must be set",
            ));
        }

        let poll_interval_secs = parse_or_default(&lookup, "POLL_INTERVAL_SECS", 60_u64)?;
        if poll_interval_secs == 0 {
            return Err(AppError::config("POLL_INTERVAL_SECS must be at least 1"));
        }

        let entry_selection = match optional(&lookup, "ENTRY_SELECTION") {
            Some(raw) => raw
                .parse::<EntrySelection>()
                .map_err(|_| AppError::config("ENTRY_SELECTION must be one of: first, all"))?,
            None => EntrySelection::First,
        };

        Ok(Self {
            influx,
            avtech,
            weather_station,
            mqtt,
            poll_interval: Duration::from_secs(poll_interval_secs),
            http_timeout,
            entry_selection,
            write_failure_policy: write_failure_policy(&lookup)?,
        })
    }
}

fn write_failure_policy<F>(lookup: &F) -> Result<WriteFailurePolicy, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let policy = optional(lookup, "WRITE_FAILURE_POLICY")
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_else(|| "fatal".to_string());

    match policy.as_str() {
        "fatal" => Ok(WriteFailurePolicy::Fatal),
        "drop" => Ok(WriteFailurePolicy::DropAndLog),
        "retry" => Ok(WriteFailurePolicy::Retry {
            max_attempts: parse_or_default(lookup, "WRITE_RETRY_ATTEMPTS", 3_u32)?,
            base_delay: Duration::from_millis(parse_or_default(
                lookup,
                "WRITE_RETRY_BASE_DELAY_MS",
                500_u64,
            )?),
        }),
        _ => Err(AppError::config(
            "WRITE_FAILURE_POLICY must be one of: fatal, drop, retry",
        )),
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| AppError::config(format!("{key} is required")))
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

fn parse_bool_or_default<F>(lookup: &F, key: &str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::config(format!("{key} must be true or false"))),
        },
        None => Ok(default),
    }
}
