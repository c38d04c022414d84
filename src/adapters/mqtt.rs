use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use rumqttc::{
    Client, ClientError, Connection, Event, Incoming, MqttOptions, QoS, RecvTimeoutError,
};
use thiserror::Error;

const CHANNEL_CAPACITY: usize = 16;
const RECV_TIMEOUT: Duration = Duration::from_secs(1);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const TEST_TOPIC: &str = "test";

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("mqtt client request failed: {0}")]
    Client(#[from] ClientError),
    #[error("mqtt event loop stopped unexpectedly")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
    pub keep_alive: Duration,
    pub publish_test_message: bool,
}

impl MqttSettings {
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options
    }
}

/// A stream of bus deliveries, driven on the calling thread until `stop` is
/// raised or the callback returns an error.
pub trait MessageSource: Send + 'static {
    fn run<F, E>(self, stop: &AtomicBool, on_message: F) -> Result<(), E>
    where
        F: FnMut(&str, &[u8]) -> Result<(), E>,
        E: From<MqttError>;
}

/// Subscription to one topic. Deliveries are handed to the callback on the
/// thread that runs it, one at a time.
pub struct MqttListener {
    client: Client,
    connection: Connection,
    settings: MqttSettings,
}

impl MqttListener {
    pub fn new(settings: MqttSettings) -> Self {
        let (client, connection) = Client::new(settings.options(), CHANNEL_CAPACITY);
        Self {
            client,
            connection,
            settings,
        }
    }

    // Clean sessions drop subscriptions on reconnect; subscribe on every ConnAck.
    fn on_connected(&self) -> Result<(), MqttError> {
        self.client
            .try_subscribe(self.settings.topic.clone(), QoS::AtLeastOnce)?;

        if self.settings.publish_test_message {
            self.client.try_publish(
                TEST_TOPIC,
                QoS::AtMostOnce,
                false,
                Utc::now().to_rfc3339(),
            )?;
        }

        Ok(())
    }
}

impl MessageSource for MqttListener {
    /// Connection failures are logged and retried.
    fn run<F, E>(mut self, stop: &AtomicBool, mut on_message: F) -> Result<(), E>
    where
        F: FnMut(&str, &[u8]) -> Result<(), E>,
        E: From<MqttError>,
    {
        while !stop.load(Ordering::Relaxed) {
            match self.connection.recv_timeout(RECV_TIMEOUT) {
                Ok(Ok(Event::Incoming(Incoming::ConnAck(_)))) => {
                    tracing::info!(
                        host = %self.settings.host,
                        port = self.settings.port,
                        "mqtt connected"
                    );
                    self.on_connected()?;
                }
                Ok(Ok(Event::Incoming(Incoming::SubAck(_)))) => {
                    tracing::info!(topic = %self.settings.topic, "mqtt subscribed to topic");
                }
                Ok(Ok(Event::Incoming(Incoming::Publish(publish)))) => {
                    tracing::debug!(
                        topic = %publish.topic,
                        bytes = publish.payload.len(),
                        "mqtt message received"
                    );
                    on_message(&publish.topic, &publish.payload)?;
                }
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, "mqtt connection lost; reconnecting");
                    std::thread::sleep(RECONNECT_DELAY);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(E::from(MqttError::Disconnected));
                }
            }
        }

        if let Err(error) = self.client.try_disconnect() {
            tracing::debug!(error = %error, "mqtt disconnect request failed");
        }

        Ok(())
    }
}
