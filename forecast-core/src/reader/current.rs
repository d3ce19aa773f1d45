use std::io::Read;
use tracing::debug;

use crate::{
    decoder::StreamingDecoder,
    error::ForecastError,
    fields::{FieldKey, FieldNameTable},
    icon::IconLoader,
    model::CurrentForecast,
    reader::{read_wrapped_value, seek_field},
};

/// Extracts current conditions from a single-day response.
#[derive(Debug)]
pub struct CurrentConditionsReader<'a> {
    root: &'a str,
    condition: &'a str,
    temperature: &'a str,
    humidity: &'a str,
    precipitation: &'a str,
    icon: &'a str,
    icons: &'a dyn IconLoader,
    sample_size: Option<u32>,
}

impl<'a> CurrentConditionsReader<'a> {
    /// Resolves every field name up front so a misconfigured table fails
    /// before any network traffic.
    pub fn new(
        fields: &'a FieldNameTable,
        icons: &'a dyn IconLoader,
        sample_size: Option<u32>,
    ) -> Result<Self, ForecastError> {
        Ok(Self {
            root: fields.get(FieldKey::CurrentRoot)?,
            condition: fields.get(FieldKey::CurrentCondition)?,
            temperature: fields.get(FieldKey::Temperature)?,
            humidity: fields.get(FieldKey::Humidity)?,
            precipitation: fields.get(FieldKey::Precipitation)?,
            icon: fields.get(FieldKey::Icon)?,
            icons,
            sample_size,
        })
    }

    /// Decode into `out`, starting before the document's root object.
    ///
    /// Fields land in `out` as they are read, so on error it still holds
    /// everything decoded up to that point. A document without the
    /// conditions key leaves `out` untouched and is not an error.
    pub fn read<R: Read>(
        &self,
        decoder: &mut StreamingDecoder<'_, R>,
        out: &mut CurrentForecast,
    ) -> Result<(), ForecastError> {
        decoder.enter_object()?;

        if !seek_field(decoder, self.root)? {
            debug!(key = self.root, "document carries no current conditions");
            return decoder.exit_object();
        }

        self.read_conditions(decoder, out)
    }

    fn read_conditions<R: Read>(
        &self,
        decoder: &mut StreamingDecoder<'_, R>,
        out: &mut CurrentForecast,
    ) -> Result<(), ForecastError> {
        decoder.enter_object()?;

        while decoder.has_next()? {
            let name = decoder.next_field_name()?;

            if name == self.condition {
                decoder.enter_array()?;
                if decoder.has_next()? {
                    self.read_conditions(decoder, out)?;
                }
                while decoder.has_next()? {
                    decoder.skip_value()?;
                }
                decoder.exit_array()?;
            } else if name == self.temperature {
                out.temperature = Some(decoder.next_string_value()?);
            } else if name == self.humidity {
                out.humidity = Some(decoder.next_string_value()?);
            } else if name == self.precipitation {
                out.precipitation_amount = Some(decoder.next_string_value()?);
            } else if name == self.icon {
                out.icon = read_wrapped_value(decoder)?
                    .and_then(|url| self.icons.load(&url, self.sample_size));
            } else {
                decoder.skip_value()?;
            }
        }

        decoder.exit_object()
    }
}
