use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::error::ForecastError;

/// Logical names for every literal the pipeline looks up: the service URL
/// prefix and the JSON keys it recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    UrlPrefix,
    CurrentRoot,
    CurrentCondition,
    ForecastList,
    Weather,
    Date,
    Hourly,
    Prediction,
    Icon,
    Temperature,
    Humidity,
    Precipitation,
    High,
    Low,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::UrlPrefix => "url_prefix",
            FieldKey::CurrentRoot => "current_root",
            FieldKey::CurrentCondition => "current_condition",
            FieldKey::ForecastList => "forecast_list",
            FieldKey::Weather => "weather",
            FieldKey::Date => "date",
            FieldKey::Hourly => "hourly",
            FieldKey::Prediction => "prediction",
            FieldKey::Icon => "icon",
            FieldKey::Temperature => "temperature",
            FieldKey::Humidity => "humidity",
            FieldKey::Precipitation => "precipitation",
            FieldKey::High => "high",
            FieldKey::Low => "low",
        }
    }

    pub const fn all() -> &'static [FieldKey] {
        &[
            FieldKey::UrlPrefix,
            FieldKey::CurrentRoot,
            FieldKey::CurrentCondition,
            FieldKey::ForecastList,
            FieldKey::Weather,
            FieldKey::Date,
            FieldKey::Hourly,
            FieldKey::Prediction,
            FieldKey::Icon,
            FieldKey::Temperature,
            FieldKey::Humidity,
            FieldKey::Precipitation,
            FieldKey::High,
            FieldKey::Low,
        ]
    }

    /// Literal used by the WorldWeatherOnline JSON service.
    fn default_literal(&self) -> &'static str {
        match self {
            FieldKey::UrlPrefix => "http://api.worldweatheronline.com/premium/v1/weather.ashx?q=",
            FieldKey::CurrentRoot => "data",
            FieldKey::CurrentCondition => "current_condition",
            FieldKey::ForecastList => "data",
            FieldKey::Weather => "weather",
            FieldKey::Date => "date",
            FieldKey::Hourly => "hourly",
            FieldKey::Prediction => "weatherDesc",
            FieldKey::Icon => "weatherIconUrl",
            FieldKey::Temperature => "temp_F",
            FieldKey::Humidity => "humidity",
            FieldKey::Precipitation => "precipMM",
            FieldKey::High => "maxtempF",
            FieldKey::Low => "mintempF",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps each [`FieldKey`] to the literal expected on the wire.
///
/// The default table targets WorldWeatherOnline. A table loaded from config
/// is taken as complete: keys it leaves out stay unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldNameTable {
    entries: BTreeMap<FieldKey, String>,
}

impl FieldNameTable {
    /// A table with no entries; every lookup fails until keys are inserted.
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: FieldKey, literal: impl Into<String>) {
        self.entries.insert(key, literal.into());
    }

    pub fn remove(&mut self, key: FieldKey) -> Option<String> {
        self.entries.remove(&key)
    }

    pub fn get(&self, key: FieldKey) -> Result<&str, ForecastError> {
        self.entries
            .get(&key)
            .map(String::as_str)
            .ok_or(ForecastError::UnresolvedResourceKey(key))
    }
}

impl Default for FieldNameTable {
    fn default() -> Self {
        let entries = FieldKey::all()
            .iter()
            .map(|key| (*key, key.default_literal().to_string()))
            .collect();

        Self { entries }
    }
}
