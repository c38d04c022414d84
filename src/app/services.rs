use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::adapters::influx::{PointWriter, WriteError};
use crate::app::policy::WriteFailurePolicy;
use crate::domain::models::MappedReading;
use crate::domain::point::{Clock, TimeSeriesPoint};

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Written,
    Dropped,
}

/// Turns mapped readings into timestamped points and writes them, applying
/// the configured failure policy.
pub struct PointEmitter<W, Cl> {
    writer: W,
    clock: Cl,
    policy: WriteFailurePolicy,
    default_location: String,
}

impl<W, Cl> PointEmitter<W, Cl>
where
    W: PointWriter,
    Cl: Clock,
{
    pub fn new(
        writer: W,
        clock: Cl,
        policy: WriteFailurePolicy,
        default_location: impl Into<String>,
    ) -> Self {
        Self {
            writer,
            clock,
            policy,
            default_location: default_location.into(),
        }
    }

    /// Only returns an error under [`WriteFailurePolicy::Fatal`]. Raising
    /// `stop` during a retry backoff drops the point.
    pub fn emit(
        &self,
        measurement: &str,
        reading: MappedReading,
        stop: &AtomicBool,
    ) -> Result<EmitOutcome, WriteError> {
        let point = TimeSeriesPoint {
            measurement: measurement.to_string(),
            sensor_location: reading
                .location
                .unwrap_or_else(|| self.default_location.clone()),
            fields: reading.fields,
            timestamp: self.clock.now(),
        };

        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            let error = match self.writer.write_point(&point) {
                Ok(()) => {
                    tracing::info!(
                        measurement = %point.measurement,
                        sensor_location = %point.sensor_location,
                        fields = point.fields.len(),
                        "point written"
                    );
                    return Ok(EmitOutcome::Written);
                }
                Err(error) => error,
            };

            match self.policy {
                WriteFailurePolicy::Fatal => return Err(error),
                WriteFailurePolicy::Retry { .. } if attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        measurement = %point.measurement,
                        sensor_location = %point.sensor_location,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "point write failed; retrying"
                    );
                    sleep_unless_stopped(delay, stop);
                    if stop.load(Ordering::Relaxed) {
                        tracing::warn!(
                            measurement = %point.measurement,
                            sensor_location = %point.sensor_location,
                            attempts = attempt,
                            "shutdown requested during retry; point dropped"
                        );
                        return Ok(EmitOutcome::Dropped);
                    }
                    attempt += 1;
                }
                WriteFailurePolicy::Retry { .. } | WriteFailurePolicy::DropAndLog => {
                    tracing::warn!(
                        measurement = %point.measurement,
                        sensor_location = %point.sensor_location,
                        attempts = attempt,
                        policy = self.policy.name(),
                        error = %error,
                        "point write failed; point dropped"
                    );
                    return Ok(EmitOutcome::Dropped);
                }
            }
        }
    }
}

/// Sleeps for `duration`, returning early once `stop_flag` is raised.
pub fn sleep_unless_stopped(duration: Duration, stop_flag: &AtomicBool) {
    let deadline = Instant::now() + duration;

    while !stop_flag.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(STOP_CHECK_INTERVAL));
    }
}
