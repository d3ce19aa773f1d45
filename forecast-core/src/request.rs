use reqwest::Url;

use crate::{
    error::ForecastError,
    fields::{FieldKey, FieldNameTable},
    model::ForecastMode,
};

/// Build the service URL for one fetch:
/// `<prefix><zipcode>&num_of_days=N&format=json&<mode flags>[&key=...]`.
pub fn request_url(
    fields: &FieldNameTable,
    zipcode: &str,
    mode: ForecastMode,
    api_key: Option<&str>,
) -> Result<Url, ForecastError> {
    let prefix = fields.get(FieldKey::UrlPrefix)?;
    validate_zipcode(zipcode)?;

    let mut raw = format!("{prefix}{zipcode}&num_of_days={}&format=json", mode.num_of_days());
    for (name, value) in mode.query_flags() {
        raw.push_str(&format!("&{name}={value}"));
    }

    let mut url = Url::parse(&raw)
        .map_err(|err| ForecastError::MalformedUrl(format!("{err} (prefix `{prefix}`)")))?;

    if let Some(key) = api_key {
        url.query_pairs_mut().append_pair("key", key);
    }

    Ok(url)
}

fn validate_zipcode(zipcode: &str) -> Result<(), ForecastError> {
    if zipcode.trim().is_empty() {
        return Err(ForecastError::MalformedUrl("zip code is empty".to_string()));
    }

    if let Some(bad) =
        zipcode.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == ' ' || *c == '-'))
    {
        return Err(ForecastError::MalformedUrl(format!(
            "zip code `{zipcode}` contains invalid character {bad:?}"
        )));
    }

    Ok(())
}
