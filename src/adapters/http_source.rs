use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub trait JsonSource<T>: Send + Sync + 'static {
    fn fetch(&self) -> Result<T, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected http status {status}")]
    Status { status: u16 },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Issues a GET against a fixed URL and decodes the JSON body.
#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    client: Client,
    url: String,
}

impl HttpJsonSource {
    /// `timeout` of `None` lets a request wait indefinitely.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl<T> JsonSource<T> for HttpJsonSource
where
    T: DeserializeOwned,
{
    fn fetch(&self) -> Result<T, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes()?;
        serde_json::from_slice(&body).map_err(FetchError::from)
    }
}
