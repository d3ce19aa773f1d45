use std::io::Read;
use tracing::debug;

use crate::{
    decoder::StreamingDecoder,
    error::ForecastError,
    fields::{FieldKey, FieldNameTable},
    icon::IconLoader,
    model::{DailyForecast, FiveDayForecast},
    reader::{day_name, read_wrapped_value, seek_field},
};

/// Extracts up to five per-day summaries from a five-day response.
#[derive(Debug)]
pub struct FiveDayReader<'a> {
    list: &'a str,
    weather: &'a str,
    date: &'a str,
    hourly: &'a str,
    prediction: &'a str,
    icon: &'a str,
    high: &'a str,
    low: &'a str,
    icons: &'a dyn IconLoader,
}

impl<'a> FiveDayReader<'a> {
    pub fn new(
        fields: &'a FieldNameTable,
        icons: &'a dyn IconLoader,
    ) -> Result<Self, ForecastError> {
        Ok(Self {
            list: fields.get(FieldKey::ForecastList)?,
            weather: fields.get(FieldKey::Weather)?,
            date: fields.get(FieldKey::Date)?,
            hourly: fields.get(FieldKey::Hourly)?,
            prediction: fields.get(FieldKey::Prediction)?,
            icon: fields.get(FieldKey::Icon)?,
            high: fields.get(FieldKey::High)?,
            low: fields.get(FieldKey::Low)?,
            icons,
        })
    }

    /// Decode into `out.days`, filling slots in document order.
    ///
    /// Slots without a source entry, and slots whose entry is an empty
    /// object, stay `None`. On error every slot decoded so far is kept,
    /// including whatever the failing entry had produced.
    pub fn read<R: Read>(
        &self,
        decoder: &mut StreamingDecoder<'_, R>,
        out: &mut FiveDayForecast,
    ) -> Result<(), ForecastError> {
        decoder.enter_object()?;
        if !seek_field(decoder, self.list)? {
            debug!(key = self.list, "document carries no forecast list");
            return decoder.exit_object();
        }

        decoder.enter_object()?;
        if !seek_field(decoder, self.weather)? {
            debug!(key = self.weather, "forecast list carries no daily entries");
            return Ok(());
        }

        decoder.enter_array()?;
        for slot in out.days.iter_mut() {
            if !decoder.has_next()? {
                break;
            }

            decoder.enter_object()?;
            if !decoder.has_next()? {
                decoder.exit_object()?;
                continue;
            }

            let mut day = DailyForecast::default();
            match self.read_day(decoder, &mut day) {
                Ok(()) => *slot = Some(day),
                Err(err) => {
                    if !day.is_empty() {
                        *slot = Some(day);
                    }
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    fn read_day<R: Read>(
        &self,
        decoder: &mut StreamingDecoder<'_, R>,
        day: &mut DailyForecast,
    ) -> Result<(), ForecastError> {
        while decoder.has_next()? {
            let name = decoder.next_field_name()?;

            if name == self.date {
                day.day = Some(day_name(&decoder.next_string_value()?).to_string());
            } else if name == self.hourly {
                self.read_hourly(decoder, day)?;
            } else if name == self.high {
                day.high_temperature = Some(decoder.next_string_value()?);
            } else if name == self.low {
                day.low_temperature = Some(decoder.next_string_value()?);
            } else {
                decoder.skip_value()?;
            }
        }

        decoder.exit_object()
    }

    /// With `tp=24` the hourly list holds a single entry covering the day.
    fn read_hourly<R: Read>(
        &self,
        decoder: &mut StreamingDecoder<'_, R>,
        day: &mut DailyForecast,
    ) -> Result<(), ForecastError> {
        decoder.enter_array()?;

        if decoder.has_next()? {
            decoder.enter_object()?;
            while decoder.has_next()? {
                let name = decoder.next_field_name()?;

                if name == self.prediction {
                    day.predicted_condition = read_wrapped_value(decoder)?;
                } else if name == self.icon {
                    day.icon =
                        read_wrapped_value(decoder)?.and_then(|url| self.icons.load(&url, None));
                } else {
                    decoder.skip_value()?;
                }
            }
            decoder.exit_object()?;
        }
        while decoder.has_next()? {
            decoder.skip_value()?;
        }

        decoder.exit_array()
    }
}
