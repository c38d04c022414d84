use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;

use crate::adapters::line_protocol::{LineProtocolError, encode_point};
use crate::domain::point::TimeSeriesPoint;

pub trait PointWriter: Send + Sync + 'static {
    fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), WriteError>;
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to build database client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("database request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("database rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to encode point: {0}")]
    Encode(#[from] LineProtocolError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfluxSettings {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// Accept any server certificate. Only for self-signed deployments.
    pub insecure_skip_verify: bool,
    pub timeout: Option<Duration>,
}

/// Blocking writer against the InfluxDB v2 HTTP write endpoint.
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: Client,
    write_url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxWriter {
    pub fn new(settings: &InfluxSettings) -> Result<Self, WriteError> {
        if settings.insecure_skip_verify {
            tracing::warn!(
                url = %settings.url,
                "tls certificate verification disabled for time-series database"
            );
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(settings.insecure_skip_verify)
            .timeout(settings.timeout)
            .build()
            .map_err(WriteError::Client)?;

        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", settings.url.trim_end_matches('/')),
            token: settings.token.clone(),
            org: settings.org.clone(),
            bucket: settings.bucket.clone(),
        })
    }
}

impl PointWriter for InfluxWriter {
    fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), WriteError> {
        let line = encode_point(point)?;

        let response = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(WriteError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
