mod config;
mod error;
mod logging;
pub mod policy;
pub mod runtime;
pub mod services;

pub use config::{AppConfig, SourceConfig};
pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    load_dotenv()?;
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        influx_url = %config.influx.url,
        influx_org = %config.influx.org,
        influx_bucket = %config.influx.bucket,
        avtech_enabled = config.avtech.is_some(),
        weather_station_enabled = config.weather_station.is_some(),
        mqtt_enabled = config.mqtt.is_some(),
        poll_interval_secs = config.poll_interval.as_secs(),
        entry_selection = ?config.entry_selection,
        write_failure_policy = config.write_failure_policy.name(),
        "application bootstrap initialized"
    );

    runtime::run(config)
}

// A missing .env file is fine; the environment may be provided by the process manager.
fn load_dotenv() -> Result<(), AppError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(error) if error.not_found() => Ok(()),
        Err(error) => Err(AppError::config(format!("failed to load .env file: {error}"))),
    }
}
