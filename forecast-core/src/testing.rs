//! In-memory collaborators and sample documents shared by unit tests.

use reqwest::Url;
use serde_json::{Value, json};
use std::{
    io::{self, Cursor, Read, Write},
    sync::{Arc, Mutex},
};
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    error::ForecastError,
    icon::IconLoader,
    model::{Icon, IconFormat},
    source::ForecastSource,
};

/// Hands out a PNG icon for every URL except those containing `broken`,
/// remembering each request.
#[derive(Debug, Default)]
pub struct RecordingIcons {
    pub requests: Mutex<Vec<(String, Option<u32>)>>,
}

impl RecordingIcons {
    pub fn requested(&self) -> Vec<(String, Option<u32>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl IconLoader for RecordingIcons {
    fn load(&self, url: &str, sample_size: Option<u32>) -> Option<Icon> {
        self.requests.lock().unwrap().push((url.to_string(), sample_size));
        if url.contains("broken") {
            return None;
        }
        Some(icon(url, sample_size))
    }
}

pub fn icon(url: &str, sample_size: Option<u32>) -> Icon {
    Icon::new(url.to_string(), IconFormat::Png, sample_size, b"\x89PNG\r\n\x1a\n".to_vec())
}

/// Serves one fixed body for every URL and records what was opened.
#[derive(Debug, Default)]
pub struct StaticSource {
    pub body: String,
    pub opened: Mutex<Vec<Url>>,
}

impl StaticSource {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into(), opened: Mutex::default() }
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }
}

impl ForecastSource for StaticSource {
    fn open(&self, url: &Url) -> Result<Box<dyn Read + Send>, ForecastError> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(Box::new(Cursor::new(self.body.clone().into_bytes())))
    }
}

/// Shared sink for formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with debug-level logging on this thread routed into a buffer.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.contents())
}

fn wrapped(value: &str) -> Value {
    json!([{ "value": value }])
}

/// Single-day response shaped like the WorldWeatherOnline service.
pub fn single_day_document() -> String {
    json!({
        "data": {
            "current_condition": [{
                "observation_time": "03:15 PM",
                "temp_C": "22",
                "temp_F": "72",
                "weatherCode": "113",
                "weatherIconUrl": wrapped("http://cdn.example/sunny.png"),
                "weatherDesc": wrapped("Sunny"),
                "precipMM": "0.0",
                "humidity": "40",
                "pressure": "1015"
            }],
            "request": [{ "type": "Zipcode", "query": "10001" }],
            "weather": [daily_entry("2024-03-04", "Sunny", "75", "60")]
        }
    })
    .to_string()
}

pub fn daily_entry(date: &str, prediction: &str, high: &str, low: &str) -> Value {
    json!({
        "date": date,
        "astronomy": [{ "sunrise": "06:30 AM", "sunset": "05:55 PM" }],
        "maxtempC": "24",
        "maxtempF": high,
        "mintempC": "16",
        "mintempF": low,
        "hourly": [{
            "time": "24",
            "tempF": high,
            "weatherCode": "113",
            "weatherIconUrl": wrapped(&format!("http://cdn.example/{date}.png")),
            "weatherDesc": wrapped(prediction),
            "precipMM": "0.0"
        }],
        "uvIndex": "5"
    })
}

/// Five-day response holding one entry per date.
pub fn five_day_document(dates: &[&str]) -> String {
    let weather: Vec<Value> = dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            daily_entry(date, &format!("Outlook {i}"), &(70 + i).to_string(), &(50 + i).to_string())
        })
        .collect();

    json!({
        "data": {
            "request": [{ "type": "Zipcode", "query": "10001" }],
            "weather": weather
        }
    })
    .to_string()
}
