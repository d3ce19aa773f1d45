//! Readers that turn a [`StreamingDecoder`] positioned at the start of a
//! service response into forecast records.

use chrono::{Datelike, NaiveDate};
use std::io::Read;
use tracing::debug;

use crate::{decoder::StreamingDecoder, error::ForecastError};

pub mod current;
pub mod five_day;

pub use current::CurrentConditionsReader;
pub use five_day::FiveDayReader;

/// Day name used when a forecast date does not parse.
pub const UNKNOWN_DAY: &str = "Unknown";

const DAY_NAMES: [&str; 7] =
    ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

/// Weekday name for a `yyyy-MM-dd` date.
pub fn day_name(date: &str) -> &'static str {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => DAY_NAMES[date.weekday().num_days_from_sunday() as usize],
        Err(err) => {
            debug!(date, error = %err, "unparsable forecast date");
            UNKNOWN_DAY
        }
    }
}

/// Skip fields of the current object until `key` is found. Returns `false`
/// with the object exhausted (but not exited) if it never appears.
pub(crate) fn seek_field<R: Read>(
    decoder: &mut StreamingDecoder<'_, R>,
    key: &str,
) -> Result<bool, ForecastError> {
    while decoder.has_next()? {
        if decoder.next_field_name()? == key {
            return Ok(true);
        }
        decoder.skip_value()?;
    }
    Ok(false)
}

/// Read a value wrapped as `[{"<any>": "<value>", ...}, ...]`: the first
/// field of the first object. Everything else in the list is skipped.
pub(crate) fn read_wrapped_value<R: Read>(
    decoder: &mut StreamingDecoder<'_, R>,
) -> Result<Option<String>, ForecastError> {
    decoder.enter_array()?;

    let mut value = None;
    if decoder.has_next()? {
        decoder.enter_object()?;
        if decoder.has_next()? {
            decoder.next_field_name()?;
            value = Some(decoder.next_string_value()?);
        }
        while decoder.has_next()? {
            decoder.next_field_name()?;
            decoder.skip_value()?;
        }
        decoder.exit_object()?;
    }
    while decoder.has_next()? {
        decoder.skip_value()?;
    }

    decoder.exit_array()?;
    Ok(value)
}
