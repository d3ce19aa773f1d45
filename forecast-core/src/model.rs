use serde::Serialize;
use std::fmt;

/// Number of per-day slots in a five-day result.
pub const FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    SingleDay,
    FiveDay,
}

impl ForecastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMode::SingleDay => "single-day",
            ForecastMode::FiveDay => "five-day",
        }
    }

    /// Number of days requested from the service.
    pub fn num_of_days(&self) -> u8 {
        match self {
            ForecastMode::SingleDay => 1,
            ForecastMode::FiveDay => FORECAST_DAYS as u8,
        }
    }

    /// Mode-specific query flags appended after `format=json`.
    pub fn query_flags(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ForecastMode::SingleDay => &[("fx", "yes"), ("includelocation", "no")],
            ForecastMode::FiveDay => &[
                ("fx", "yes"),
                ("cc", "no"),
                ("mca", "no"),
                ("fx24", "no"),
                ("includelocation", "no"),
                ("show_comments", "no"),
                ("tp", "24"),
            ],
        }
    }
}

impl fmt::Display for ForecastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconFormat {
    Png,
    Jpeg,
    Gif,
}

impl IconFormat {
    /// Identify an image payload by its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(IconFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(IconFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(IconFormat::Gif)
        } else {
            None
        }
    }
}

/// Opaque handle to a downloaded sky-condition image.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    url: String,
    format: IconFormat,
    sample_size: Option<u32>,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl Icon {
    pub fn new(url: String, format: IconFormat, sample_size: Option<u32>, bytes: Vec<u8>) -> Self {
        Self { url, format, sample_size, bytes }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format(&self) -> IconFormat {
        self.format
    }

    pub fn sample_size(&self) -> Option<u32> {
        self.sample_size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Icon")
            .field("url", &self.url)
            .field("format", &self.format)
            .field("sample_size", &self.sample_size)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Current conditions from a single-day request. Every field is absent
/// unless the document presented it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentForecast {
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub precipitation_amount: Option<String>,
    pub icon: Option<Icon>,
}

impl CurrentForecast {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.precipitation_amount.is_none()
            && self.icon.is_none()
    }
}

/// One day's summary from a five-day request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyForecast {
    /// Weekday name, or [`crate::reader::UNKNOWN_DAY`] if the date did not parse.
    pub day: Option<String>,
    pub predicted_condition: Option<String>,
    pub high_temperature: Option<String>,
    pub low_temperature: Option<String>,
    pub icon: Option<Icon>,
}

impl DailyForecast {
    pub fn is_empty(&self) -> bool {
        self.day.is_none()
            && self.predicted_condition.is_none()
            && self.high_temperature.is_none()
            && self.low_temperature.is_none()
            && self.icon.is_none()
    }
}

/// Slot `i` holds the forecast for day `i + 1` after the request's start day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FiveDayForecast {
    pub days: [Option<DailyForecast>; FORECAST_DAYS],
}

impl FiveDayForecast {
    pub fn iter(&self) -> impl Iterator<Item = Option<&DailyForecast>> {
        self.days.iter().map(Option::as_ref)
    }

    /// Number of slots that were filled.
    pub fn populated(&self) -> usize {
        self.days.iter().filter(|d| d.is_some()).count()
    }
}
