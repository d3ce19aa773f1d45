use forecast_core::{CurrentForecast, FiveDayForecast, ForecastListener};
use std::fmt::Write;

const ABSENT: &str = "n/a";

/// Collects delivered forecasts and renders them for the terminal.
#[derive(Debug)]
pub struct Printer {
    zipcode: String,
    json: bool,
    output: String,
    error: Option<serde_json::Error>,
}

impl Printer {
    pub fn new(zipcode: &str, json: bool) -> Self {
        Self { zipcode: zipcode.to_string(), json, output: String::new(), error: None }
    }

    pub fn into_output(self) -> anyhow::Result<String> {
        match self.error {
            Some(err) => Err(anyhow::Error::new(err).context("Failed to serialize forecast")),
            None => Ok(self.output),
        }
    }

    fn push_json<T: serde::Serialize>(&mut self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => {
                self.output.push_str(&json);
                self.output.push('\n');
            }
            Err(err) => self.error = Some(err),
        }
    }
}

fn or_absent(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(ABSENT)
}

impl ForecastListener for Printer {
    fn on_single_day_loaded(&mut self, forecast: CurrentForecast) {
        if self.json {
            self.push_json(&forecast);
            return;
        }

        let out = &mut self.output;
        let _ = writeln!(out, "Current conditions for {}", self.zipcode);
        let _ = writeln!(out, "  Temperature:   {}", or_absent(&forecast.temperature));
        let _ = writeln!(out, "  Humidity:      {}", or_absent(&forecast.humidity));
        let _ = writeln!(out, "  Precipitation: {}", or_absent(&forecast.precipitation_amount));
        let _ = writeln!(
            out,
            "  Icon:          {}",
            forecast.icon.as_ref().map(|icon| icon.url()).unwrap_or(ABSENT)
        );
    }

    fn on_five_day_loaded(&mut self, forecasts: FiveDayForecast) {
        if self.json {
            self.push_json(&forecasts);
            return;
        }

        let out = &mut self.output;
        let _ = writeln!(out, "Five-day forecast for {}", self.zipcode);
        for (slot, day) in forecasts.iter().enumerate() {
            match day {
                Some(day) => {
                    let _ = writeln!(
                        out,
                        "  {}. {:<10} {:<24} high {:>4}  low {:>4}",
                        slot + 1,
                        or_absent(&day.day),
                        or_absent(&day.predicted_condition),
                        or_absent(&day.high_temperature),
                        or_absent(&day.low_temperature),
                    );
                }
                None => {
                    let _ = writeln!(out, "  {}. {ABSENT}", slot + 1);
                }
            }
        }
    }
}
