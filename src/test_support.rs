use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::adapters::http_source::{FetchError, JsonSource};
use crate::adapters::influx::{PointWriter, WriteError};
use crate::adapters::mqtt::{MessageSource, MqttError};
use crate::domain::point::{Clock, TimeSeriesPoint};

/// Loopback HTTP server that answers exactly one request and hands back
/// the raw request text.
pub struct OneShotResponder {
    port: u16,
    handle: JoinHandle<String>,
}

impl OneShotResponder {
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub fn request(self) -> String {
        self.handle
            .join()
            .expect("responder thread should terminate cleanly")
    }
}

pub fn respond_once(status: u16, body: &str) -> OneShotResponder {
    let listener = TcpListener::bind("127.0.0.1:0").expect("responder socket should bind");
    let port = listener
        .local_addr()
        .expect("addr should be available")
        .port();
    let body = body.to_string();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("responder should accept");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout should be configurable");

        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            if (200..300).contains(&status) { "OK" } else { "Error" },
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .expect("responder send should succeed");
        request
    });

    OneShotResponder { port, handle }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buffer = [0_u8; 1024];

    loop {
        let size = stream.read(&mut buffer).expect("request should be readable");
        if size == 0 {
            break;
        }
        raw.extend_from_slice(&buffer[..size]);

        if let Some(header_end) = find_header_end(&raw) {
            let headers = String::from_utf8_lossy(&raw[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&raw).into_owned()
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

pub fn unused_local_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("port lookup socket should bind");
    listener
        .local_addr()
        .expect("addr should be available")
        .port()
}

pub fn unused_local_url() -> String {
    format!("http://127.0.0.1:{}/", unused_local_port())
}

/// Captures written points; the first `failures` writes are rejected.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    points: Arc<Mutex<Vec<TimeSeriesPoint>>>,
    attempts: Arc<Mutex<usize>>,
    failures: Arc<Mutex<usize>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: usize) -> Self {
        let writer = Self::default();
        *writer.failures.lock().expect("lock") = failures;
        writer
    }

    pub fn points(&self) -> Vec<TimeSeriesPoint> {
        self.points.lock().expect("lock").clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().expect("lock")
    }
}

impl PointWriter for RecordingWriter {
    fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), WriteError> {
        *self.attempts.lock().expect("lock") += 1;

        let mut failures = self.failures.lock().expect("lock");
        if *failures > 0 {
            *failures -= 1;
            return Err(WriteError::Rejected {
                status: 503,
                body: "scripted failure".to_string(),
            });
        }

        self.points.lock().expect("lock").push(point.clone());
        Ok(())
    }
}

/// Hands out scripted fetch results in order, then reports 503.
pub struct ScriptedSource<T> {
    results: Mutex<VecDeque<Result<T, FetchError>>>,
}

impl<T> ScriptedSource<T> {
    pub fn new(results: Vec<Result<T, FetchError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }
}

impl<T> JsonSource<T> for ScriptedSource<T>
where
    T: Send + 'static,
{
    fn fetch(&self) -> Result<T, FetchError> {
        self.results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(Err(FetchError::Status { status: 503 }))
    }
}

/// Delivers scripted bus messages in order, then idles until stopped.
pub struct ScriptedMessages {
    topic: String,
    payloads: Vec<Vec<u8>>,
}

impl ScriptedMessages {
    pub fn new(topic: &str, payloads: Vec<&[u8]>) -> Self {
        Self {
            topic: topic.to_string(),
            payloads: payloads.into_iter().map(<[u8]>::to_vec).collect(),
        }
    }
}

impl MessageSource for ScriptedMessages {
    fn run<F, E>(self, stop: &AtomicBool, mut on_message: F) -> Result<(), E>
    where
        F: FnMut(&str, &[u8]) -> Result<(), E>,
        E: From<MqttError>,
    {
        for payload in &self.payloads {
            on_message(&self.topic, payload)?;
        }
        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_seconds(seconds: i64) -> Self {
        Self(DateTime::<Utc>::from_timestamp(seconds, 0).expect("valid timestamp"))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
