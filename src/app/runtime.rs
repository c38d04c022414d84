use std::marker::PhantomData;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::adapters::http_source::{FetchError, HttpJsonSource, JsonSource};
use crate::adapters::influx::{InfluxWriter, PointWriter, WriteError};
use crate::adapters::mqtt::{MessageSource, MqttError, MqttListener};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::{EmitOutcome, PointEmitter, sleep_unless_stopped};
use crate::domain::avtech::AvtechResponse;
use crate::domain::models::{EntrySelection, MapError, SensorPayload};
use crate::domain::point::Clock;
use crate::domain::rpi::RpiSensorData;
use crate::domain::weather_station::WeatherStationResponse;

const UNKNOWN_LOCATION: &str = "unknown";

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to fetch payload: {0}")]
    Fetch(#[source] FetchError),
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to map payload: {0}")]
    Map(#[source] MapError),
    #[error("failed to write point: {0}")]
    Write(#[source] WriteError),
    #[error("message listener failed: {0}")]
    Listener(#[from] MqttError),
}

impl IngestError {
    /// Fatal errors stop the worker; everything else only skips one iteration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Write(_) | Self::Listener(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub written: usize,
    pub dropped: usize,
}

pub type WorkerHandle = JoinHandle<Result<(), IngestError>>;

/// Maps the whole payload before writing anything, so a mapping failure
/// never leaves a partial set of points behind.
fn ingest<P, W, Cl>(
    payload: &P,
    selection: EntrySelection,
    emitter: &PointEmitter<W, Cl>,
    stop: &AtomicBool,
) -> Result<IngestSummary, IngestError>
where
    P: SensorPayload,
    W: PointWriter,
    Cl: Clock,
{
    let readings = payload.readings(selection).map_err(IngestError::Map)?;
    let mut summary = IngestSummary::default();

    for reading in readings {
        match emitter
            .emit(P::MEASUREMENT, reading, stop)
            .map_err(IngestError::Write)?
        {
            EmitOutcome::Written => summary.written += 1,
            EmitOutcome::Dropped => summary.dropped += 1,
        }
    }

    Ok(summary)
}

/// One polling worker: fetch, map and write a single source.
pub struct SourcePoller<S, P, W, Cl> {
    name: &'static str,
    source: S,
    selection: EntrySelection,
    emitter: PointEmitter<W, Cl>,
    _payload: PhantomData<fn() -> P>,
}

impl<S, P, W, Cl> SourcePoller<S, P, W, Cl>
where
    S: JsonSource<P>,
    P: SensorPayload,
    W: PointWriter,
    Cl: Clock,
{
    pub fn new(
        name: &'static str,
        source: S,
        selection: EntrySelection,
        emitter: PointEmitter<W, Cl>,
    ) -> Self {
        Self {
            name,
            source,
            selection,
            emitter,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tick(&self, stop: &AtomicBool) -> Result<IngestSummary, IngestError> {
        let payload = self.source.fetch().map_err(IngestError::Fetch)?;
        tracing::debug!(source = self.name, "payload fetched");

        ingest(&payload, self.selection, &self.emitter, stop)
    }
}

/// Handles bus deliveries: decode, map and write one message at a time.
pub struct MessageIngestor<W, Cl> {
    selection: EntrySelection,
    emitter: PointEmitter<W, Cl>,
}

impl<W, Cl> MessageIngestor<W, Cl>
where
    W: PointWriter,
    Cl: Clock,
{
    pub fn new(selection: EntrySelection, emitter: PointEmitter<W, Cl>) -> Self {
        Self { selection, emitter }
    }

    pub fn handle(
        &self,
        payload: &[u8],
        stop: &AtomicBool,
    ) -> Result<IngestSummary, IngestError> {
        let message: RpiSensorData =
            serde_json::from_slice(payload).map_err(IngestError::Decode)?;

        ingest(&message, self.selection, &self.emitter, stop)
    }
}

// Raises the stop flag if the owning worker thread unwinds, so the other
// workers and the orchestrator do not wait on a dead worker.
struct StopOnPanic(Arc<AtomicBool>);

impl Drop for StopOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

pub fn start_poller<S, P, W, Cl>(
    poller: SourcePoller<S, P, W, Cl>,
    poll_interval: Duration,
    stop_flag: Arc<AtomicBool>,
) -> std::io::Result<WorkerHandle>
where
    S: JsonSource<P>,
    P: SensorPayload,
    W: PointWriter,
    Cl: Clock + Send + 'static,
{
    let thread_name = format!("poller-{}", poller.name());
    std::thread::Builder::new().name(thread_name).spawn(move || {
        let _guard = StopOnPanic(Arc::clone(&stop_flag));

        while !stop_flag.load(Ordering::Relaxed) {
            match poller.tick(&stop_flag) {
                Ok(summary) => tracing::info!(
                    source = poller.name(),
                    written = summary.written,
                    dropped = summary.dropped,
                    "poll cycle completed"
                ),
                Err(error) if error.is_fatal() => {
                    tracing::error!(source = poller.name(), error = %error, "poll worker stopping");
                    stop_flag.store(true, Ordering::Relaxed);
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(source = poller.name(), error = %error, "poll cycle failed");
                }
            }
            sleep_unless_stopped(poll_interval, &stop_flag);
        }

        Ok(())
    })
}

pub fn start_listener<L, W, Cl>(
    listener: L,
    ingestor: MessageIngestor<W, Cl>,
    stop_flag: Arc<AtomicBool>,
) -> std::io::Result<WorkerHandle>
where
    L: MessageSource,
    W: PointWriter,
    Cl: Clock + Send + 'static,
{
    std::thread::Builder::new()
        .name("mqtt-listener".to_string())
        .spawn(move || {
            let _guard = StopOnPanic(Arc::clone(&stop_flag));

            let result = listener.run(&stop_flag, |topic, payload| {
                match ingestor.handle(payload, &stop_flag) {
                    Ok(summary) => {
                        tracing::debug!(topic, written = summary.written, "message ingested");
                        Ok(())
                    }
                    Err(error) if error.is_fatal() => Err(error),
                    Err(error) => {
                        tracing::warn!(topic, error = %error, "message skipped");
                        Ok(())
                    }
                }
            });

            if let Err(error) = &result {
                tracing::error!(error = %error, "listener worker stopping");
                stop_flag.store(true, Ordering::Relaxed);
            }

            result
        })
}

/// Waits for every worker and reports the first failure. A panicked worker
/// raises the stop flag so the remaining workers wind down.
pub fn join_workers(
    workers: Vec<(&'static str, WorkerHandle)>,
    stop_flag: &AtomicBool,
) -> Result<(), AppError> {
    let mut failure = None;
    for (name, handle) in workers {
        match handle.join() {
            Ok(Ok(())) => tracing::info!(worker = name, "worker stopped"),
            Ok(Err(error)) => {
                failure.get_or_insert(AppError::worker(name, error));
            }
            Err(_) => {
                stop_flag.store(true, Ordering::Relaxed);
                failure.get_or_insert(AppError::runtime(format!("{name} worker thread panicked")));
            }
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let writer = InfluxWriter::new(&config.influx).map_err(AppError::runtime)?;
    let stop_flag = Arc::new(AtomicBool::new(false));

    let signal_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        tracing::info!("shutdown signal received");
        signal_flag.store(true, Ordering::Relaxed);
    })
    .map_err(AppError::runtime)?;

    let mut workers: Vec<(&'static str, WorkerHandle)> = Vec::new();

    if let Some(source) = &config.avtech {
        let client = HttpJsonSource::new(&source.url, config.http_timeout)
            .map_err(AppError::runtime)?;
        let poller: SourcePoller<_, AvtechResponse, _, _> = SourcePoller::new(
            "avtech",
            client,
            config.entry_selection,
            PointEmitter::new(
                writer.clone(),
                SystemClock,
                config.write_failure_policy,
                source.location.clone(),
            ),
        );
        tracing::info!(url = %source.url, "avtech poller starting");
        workers.push((
            poller.name(),
            start_poller(poller, config.poll_interval, Arc::clone(&stop_flag))
                .map_err(AppError::runtime)?,
        ));
    }

    if let Some(source) = &config.weather_station {
        let client = HttpJsonSource::new(&source.url, config.http_timeout)
            .map_err(AppError::runtime)?;
        let poller: SourcePoller<_, WeatherStationResponse, _, _> = SourcePoller::new(
            "weather_station",
            client,
            config.entry_selection,
            PointEmitter::new(
                writer.clone(),
                SystemClock,
                config.write_failure_policy,
                source.location.clone(),
            ),
        );
        tracing::info!("weather station poller starting");
        workers.push((
            poller.name(),
            start_poller(poller, config.poll_interval, Arc::clone(&stop_flag))
                .map_err(AppError::runtime)?,
        ));
    }

    if let Some(settings) = &config.mqtt {
        let ingestor = MessageIngestor::new(
            config.entry_selection,
            PointEmitter::new(
                writer.clone(),
                SystemClock,
                config.write_failure_policy,
                UNKNOWN_LOCATION,
            ),
        );
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            topic = %settings.topic,
            "message listener starting"
        );
        workers.push((
            "mqtt_listener",
            start_listener(
                MqttListener::new(settings.clone()),
                ingestor,
                Arc::clone(&stop_flag),
            )
            .map_err(AppError::runtime)?,
        ));
    }

    join_workers(workers, &stop_flag)
}
